use crate::services::signer;
use anyhow::Result;
use std::io::Read;
use std::path::Path;

fn read_body(file: &Path) -> Result<Vec<u8>> {
    if file == Path::new("-") {
        let mut buf = Vec::new();
        std::io::stdin().read_to_end(&mut buf)?;
        Ok(buf)
    } else {
        Ok(std::fs::read(file)?)
    }
}

pub fn sign(secret: &str, file: &Path) -> Result<()> {
    let body = read_body(file)?;
    let signature = signer::sign(&body, secret)?;
    println!("{}: {}", signer::SIGNATURE_HEADER, signature);
    Ok(())
}

pub fn verify(secret: &str, signature: &str, file: &Path) -> Result<()> {
    let body = read_body(file)?;
    if signer::verify(&body, secret, signature) {
        println!("signature valid");
        Ok(())
    } else {
        anyhow::bail!("signature mismatch")
    }
}
