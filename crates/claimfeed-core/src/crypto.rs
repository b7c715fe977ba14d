//! Issuer key material: an Ed25519 signing key and a self-signed certificate.
//!
//! Ed25519 keys are persisted as PKCS#8 v1 PEM so both `ed25519-dalek` and
//! the `ring`-backed consumers (`rcgen`, `jsonwebtoken`) accept them. The
//! certificate is marked as a CA, because the ledger is asked to trust it as
//! one during governance bootstrap.

use std::fmt;

use ed25519_dalek::pkcs8::spki::der::pem::{self, LineEnding};
use ed25519_dalek::pkcs8::{DecodePrivateKey, EncodePrivateKey, KeypairBytes};
use ed25519_dalek::SigningKey;
use rcgen::{BasicConstraints, CertificateParams, DistinguishedName, DnType, IsCa, KeyPair};
use sha2::{Digest, Sha256};

use crate::error::{CoreError, Result};
use crate::issuer::Issuer;

const CERTIFICATE_LABEL: &str = "CERTIFICATE";

/// An issuer's signing key and certificate.
///
/// Both PEM texts are kept exactly as generated or read, so reloading the
/// same files yields byte-identical material.
#[derive(Clone)]
pub struct KeyMaterial {
    signing_key: SigningKey,
    key_pem: String,
    cert_pem: String,
    cert_der: Vec<u8>,
}

impl KeyMaterial {
    /// Generate a fresh key and a self-signed certificate for `issuer`.
    pub fn generate(issuer: &Issuer) -> Result<Self> {
        let mut rng = rand::rngs::OsRng;
        let signing_key = SigningKey::generate(&mut rng);
        let key_pem = encode_key_pem(&signing_key)?;

        let key_pair = KeyPair::from_pem(&key_pem)
            .map_err(|e| CoreError::KeyMaterial(format!("certificate key: {e}")))?;
        let mut params = CertificateParams::new(vec!["localhost".to_string()])
            .map_err(|e| CoreError::KeyMaterial(format!("certificate params: {e}")))?;
        let mut name = DistinguishedName::new();
        name.push(DnType::CommonName, issuer.name());
        params.distinguished_name = name;
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);

        let cert = params
            .self_signed(&key_pair)
            .map_err(|e| CoreError::KeyMaterial(format!("self-signing: {e}")))?;

        Ok(Self {
            signing_key,
            key_pem,
            cert_pem: cert.pem(),
            cert_der: cert.der().to_vec(),
        })
    }

    /// Load material from its PEM texts.
    pub fn from_pem(key_pem: &str, cert_pem: &str) -> Result<Self> {
        let signing_key = SigningKey::from_pkcs8_pem(key_pem)
            .map_err(|e| CoreError::KeyMaterial(format!("private key: {e}")))?;
        let cert_der = pem_to_der(cert_pem, CERTIFICATE_LABEL)?;
        Ok(Self {
            signing_key,
            key_pem: key_pem.to_string(),
            cert_pem: cert_pem.to_string(),
            cert_der,
        })
    }

    /// The private key as PKCS#8 PEM.
    pub fn key_pem(&self) -> &str {
        &self.key_pem
    }

    /// The certificate as PEM.
    pub fn cert_pem(&self) -> &str {
        &self.cert_pem
    }

    /// The certificate as DER.
    pub fn cert_der(&self) -> &[u8] {
        &self.cert_der
    }

    /// The raw 32-byte Ed25519 public key.
    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// The private key as PKCS#8 v1 DER.
    pub fn pkcs8_der(&self) -> Result<Vec<u8>> {
        let keypair = KeypairBytes {
            secret_key: self.signing_key.to_bytes(),
            public_key: None,
        };
        let document = keypair
            .to_pkcs8_der()
            .map_err(|e| CoreError::Encoding(format!("pkcs8: {e}")))?;
        Ok(document.as_bytes().to_vec())
    }

    /// SHA-256 over the certificate DER.
    pub fn cert_thumbprint(&self) -> [u8; 32] {
        Sha256::digest(&self.cert_der).into()
    }

    /// Hex certificate thumbprint, for logs.
    pub fn fingerprint(&self) -> String {
        hex::encode(self.cert_thumbprint())
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyMaterial(cert {}...)", &self.fingerprint()[..16])
    }
}

fn encode_key_pem(signing_key: &SigningKey) -> Result<String> {
    let keypair = KeypairBytes {
        secret_key: signing_key.to_bytes(),
        public_key: None,
    };
    let pem = keypair
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| CoreError::Encoding(format!("pkcs8 pem: {e}")))?;
    Ok(pem.as_str().to_string())
}

/// Decode a single PEM document into DER, requiring its label to be `label`.
pub fn pem_to_der(pem_text: &str, label: &str) -> Result<Vec<u8>> {
    let (found, der) = pem::decode_vec(pem_text.trim().as_bytes())
        .map_err(|e| CoreError::Encoding(format!("{label} PEM: {e}")))?;
    if found != label {
        return Err(CoreError::Encoding(format!(
            "expected a {label} PEM document, found {found}"
        )));
    }
    Ok(der)
}
