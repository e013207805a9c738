use crate::error::ScriptError;
use crate::Result;
use rcgen::{
    BasicConstraints, Certificate, CertificateParams, DistinguishedName, DnType, IsCa, KeyPair,
    PKCS_ECDSA_P256_SHA256,
};
use std::fs;
use std::path::Path;
use time::{Duration, OffsetDateTime};

const CA_COMMON_NAME: &str = "Netscript Rewrite CA";
const CA_ORGANIZATION: &str = "Netscript";

/// Root certificate authority used to intercept TLS traffic to the ad endpoints.
///
/// The certificate and key are kept as `ca.pem`/`ca.key` in the store
/// directory; `ca.crt` is written alongside for installing on devices.
pub struct CertificateAuthority {
    ca_cert: Certificate,
}

impl CertificateAuthority {
    /// Load the CA from `ca_dir`, generating and saving one if it does not exist.
    pub fn new(ca_dir: &Path) -> Result<Self> {
        let ca_cert_path = ca_dir.join("ca.pem");
        let ca_key_path = ca_dir.join("ca.key");

        if ca_cert_path.exists() && ca_key_path.exists() {
            Self::load(&ca_cert_path, &ca_key_path)
        } else {
            if !ca_dir.exists() {
                fs::create_dir_all(ca_dir)?;
            }
            Self::generate_and_save(&ca_cert_path, &ca_key_path)
        }
    }

    fn load(cert_path: &Path, key_path: &Path) -> Result<Self> {
        let cert_pem = fs::read_to_string(cert_path)?;
        let key_pem = fs::read_to_string(key_path)?;

        Self::from_pem(&cert_pem, &key_pem)
    }

    /// Rebuild the CA from PEM strings.
    ///
    /// rcgen cannot sign with a parsed certificate, so the CA certificate is
    /// re-issued from the stored key with the same subject.
    pub fn from_pem(_cert_pem: &str, key_pem: &str) -> Result<Self> {
        let key_pair = KeyPair::from_pem(key_pem)
            .map_err(|e| ScriptError::Certificate(format!("Failed to parse CA key: {}", e)))?;

        let mut params = ca_params();
        params.key_pair = Some(key_pair);

        let cert = Certificate::from_params(params)
            .map_err(|e| ScriptError::Certificate(format!("Failed to recreate CA cert: {}", e)))?;

        Ok(Self { ca_cert: cert })
    }

    fn generate_and_save(cert_path: &Path, key_path: &Path) -> Result<Self> {
        let mut params = ca_params();

        // Valid for 10 years
        let not_before = OffsetDateTime::now_utc();
        params.not_before = not_before;
        params.not_after = not_before + Duration::days(365 * 10);

        let key_pair = KeyPair::generate(&PKCS_ECDSA_P256_SHA256)
            .map_err(|e| ScriptError::Certificate(format!("Failed to generate CA key: {}", e)))?;
        params.key_pair = Some(key_pair);

        let cert = Certificate::from_params(params)
            .map_err(|e| ScriptError::Certificate(format!("Failed to generate CA cert: {}", e)))?;

        let cert_pem = cert
            .serialize_pem()
            .map_err(|e| ScriptError::Certificate(format!("Failed to serialize CA cert: {}", e)))?;
        let key_pem = cert.serialize_private_key_pem();

        fs::write(cert_path, &cert_pem)?;
        fs::write(key_path, &key_pem)?;
        fs::write(cert_path.with_extension("crt"), &cert_pem)?;

        Ok(Self { ca_cert: cert })
    }

    /// Root certificate in PEM format, for installing on client devices.
    pub fn get_ca_cert_pem(&self) -> Result<String> {
        self.ca_cert
            .serialize_pem()
            .map_err(|e| ScriptError::Certificate(format!("Failed to serialize CA cert: {}", e)))
    }

    /// Root certificate in DER format (for use with rustls/hudsucker).
    pub fn get_ca_cert_der(&self) -> Result<Vec<u8>> {
        self.ca_cert
            .serialize_der()
            .map_err(|e| ScriptError::Certificate(format!("Failed to serialize CA cert DER: {}", e)))
    }

    /// Root private key in DER format (for use with rustls/hudsucker).
    pub fn get_ca_key_der(&self) -> Vec<u8> {
        self.ca_cert.serialize_private_key_der()
    }
}

fn ca_params() -> CertificateParams {
    let mut params = CertificateParams::default();
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, CA_COMMON_NAME);
    dn.push(DnType::OrganizationName, CA_ORGANIZATION);
    params.distinguished_name = dn;
    params.is_ca = IsCa::Ca(BasicConstraints::Constrained(0));
    params.key_usages = vec![
        rcgen::KeyUsagePurpose::KeyCertSign,
        rcgen::KeyUsagePurpose::CrlSign,
    ];
    params
}
