use crate::errors::ServerError;
use rustls::pki_types::CertificateDer;
use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;
use tokio_rustls::TlsAcceptor;
use zonemux_application::services::TlsFiles;

/// Build a TLS acceptor from a PEM certificate chain and private key.
pub fn load_acceptor(addr: &str, files: &TlsFiles) -> Result<TlsAcceptor, ServerError> {
    let fail = |reason: String| ServerError::Tls {
        addr: addr.to_string(),
        reason,
    };

    let cert_file = File::open(&files.cert)
        .map_err(|e| fail(format!("cannot open certificate {}: {e}", files.cert)))?;
    let certs: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut BufReader::new(cert_file))
        .collect::<Result<_, _>>()
        .map_err(|e| fail(format!("cannot parse certificate {}: {e}", files.cert)))?;
    if certs.is_empty() {
        return Err(fail(format!("no certificates in {}", files.cert)));
    }

    let key_file = File::open(&files.key)
        .map_err(|e| fail(format!("cannot open private key {}: {e}", files.key)))?;
    let key = rustls_pemfile::private_key(&mut BufReader::new(key_file))
        .map_err(|e| fail(format!("cannot parse private key {}: {e}", files.key)))?
        .ok_or_else(|| fail(format!("no private key in {}", files.key)))?;

    let mut config = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| fail(e.to_string()))?;
    config.alpn_protocols = vec![b"dot".to_vec()];

    Ok(TlsAcceptor::from(Arc::new(config)))
}
