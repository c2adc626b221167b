mod common;

use std::fs;

use pinning_engine as pe;
use pinning_engine::adapters::bundle::{certificates_from_bytes, certificates_from_pem};

#[test]
fn loads_der_and_pem_files_and_skips_the_rest() {
    let dir = tempfile::tempdir().unwrap();
    let der = common::self_signed(&["der.example.com"]);
    let pem = common::self_signed_pem(&["pem.example.com"]);

    fs::write(dir.path().join("server.cer"), &der).unwrap();
    fs::write(dir.path().join("bundle.PEM"), &pem).unwrap();
    fs::write(dir.path().join("broken.der"), b"definitely not DER").unwrap();
    fs::write(dir.path().join("notes.txt"), &der).unwrap();
    fs::create_dir(dir.path().join("nested.crt")).unwrap();

    let certs = pe::certificates_in_dir(dir.path()).unwrap();
    assert_eq!(certs.len(), 2);
    assert!(certs.contains(&der));
    for cert in &certs {
        assert!(pe::extract_public_key(cert).is_ok());
    }
}

#[test]
fn empty_directory_yields_no_certificates() {
    let dir = tempfile::tempdir().unwrap();
    assert!(pe::certificates_in_dir(dir.path()).unwrap().is_empty());
}

#[test]
fn missing_directory_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = pe::certificates_in_dir(&dir.path().join("missing")).unwrap_err();
    assert!(matches!(err, pe::EngineError::Config(_)));
}

#[test]
fn pem_buffer_with_several_blocks() {
    let a = common::self_signed_pem(&["a.example.com"]);
    let b = common::self_signed_pem(&["b.example.com"]);
    let key = common::generate_key_pem();
    let text = format!("{a}\n{key}\n{b}");

    let certs = certificates_from_pem(text.as_bytes());
    assert_eq!(certs.len(), 2);
    let names: Vec<_> = certs
        .iter()
        .map(|c| pinning_engine::crypto::hostname::certificate_names(c).unwrap().dns_names)
        .collect();
    assert_eq!(names, vec![vec!["a.example.com".to_string()], vec!["b.example.com".to_string()]]);
}

#[test]
fn raw_bytes_are_sniffed() {
    let der = common::self_signed(&["example.com"]);
    assert_eq!(certificates_from_bytes(&der), vec![der.clone()]);
    let pem = common::self_signed_pem(&["example.com"]);
    assert_eq!(certificates_from_bytes(format!("\n\n{pem}").as_bytes()).len(), 1);
    assert!(certificates_from_bytes(b"garbage").is_empty());
}

#[test]
fn loaded_bundle_pins_the_server() {
    let dir = tempfile::tempdir().unwrap();
    let leaf = common::self_signed(&["example.com"]);
    fs::write(dir.path().join("server.der"), &leaf).unwrap();

    let pins = pe::certificates_in_dir(dir.path()).unwrap();
    let policy = pe::SecurityPolicy::with_pinned_certificates(pe::PinningMode::Certificate, pins);
    let t = common::trust(vec![leaf], true);
    assert!(pe::evaluate_server_trust(&policy, &t, Some("example.com")));
}
