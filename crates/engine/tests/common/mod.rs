#![allow(dead_code)]

use std::net::IpAddr;

use pinning_engine as pe;
use rcgen::{
    BasicConstraints, Certificate, CertificateParams, DistinguishedName, DnType,
    ExtendedKeyUsagePurpose, IsCa, KeyPair, SanType, PKCS_ECDSA_P256_SHA256,
};

/// A test certificate authority able to issue leaves.
pub struct TestCa {
    pub cert: Certificate,
    pub der: Vec<u8>,
}

fn named(cn: &str) -> DistinguishedName {
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, cn);
    dn
}

/// Generate a fresh P-256 key pair in PKCS#8 PEM so several certificates can share it.
pub fn generate_key_pem() -> String {
    KeyPair::generate(&PKCS_ECDSA_P256_SHA256)
        .expect("keypair")
        .serialize_pem()
}

pub fn generate_ca(cn: &str) -> TestCa {
    let mut params = CertificateParams::new(vec![]);
    params.alg = &PKCS_ECDSA_P256_SHA256;
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.distinguished_name = named(cn);
    let cert = Certificate::from_params(params).expect("ca cert");
    let der = cert.serialize_der().expect("ca der");
    TestCa { cert, der }
}

/// Server certificate parameters for `names` (DNS SANs, first one also the CN).
pub fn leaf_params(names: &[&str], key_pem: Option<&str>) -> CertificateParams {
    let mut params = CertificateParams::new(names.iter().map(|n| n.to_string()).collect::<Vec<_>>());
    params.alg = &PKCS_ECDSA_P256_SHA256;
    params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];
    if let Some(first) = names.first() {
        params.distinguished_name = named(first);
    }
    if let Some(pem) = key_pem {
        params.key_pair = Some(KeyPair::from_pem(pem).expect("key from pem"));
    }
    params
}

pub fn issue_leaf(ca: &TestCa, names: &[&str]) -> Vec<u8> {
    issue(ca, leaf_params(names, None))
}

pub fn issue_leaf_with_key(ca: &TestCa, names: &[&str], key_pem: &str) -> Vec<u8> {
    issue(ca, leaf_params(names, Some(key_pem)))
}

pub fn issue(ca: &TestCa, params: CertificateParams) -> Vec<u8> {
    let cert = Certificate::from_params(params).expect("leaf cert");
    cert.serialize_der_with_signer(&ca.cert).expect("leaf der")
}

pub fn self_signed(names: &[&str]) -> Vec<u8> {
    let cert = Certificate::from_params(leaf_params(names, None)).expect("self-signed cert");
    cert.serialize_der().expect("self-signed der")
}

pub fn self_signed_with_key(names: &[&str], key_pem: &str) -> Vec<u8> {
    let cert = Certificate::from_params(leaf_params(names, Some(key_pem))).expect("self-signed cert");
    cert.serialize_der().expect("self-signed der")
}

/// Self-signed certificate in PEM form.
pub fn self_signed_pem(names: &[&str]) -> String {
    let cert = Certificate::from_params(leaf_params(names, None)).expect("self-signed cert");
    cert.serialize_pem().expect("self-signed pem")
}

/// Self-signed certificate with only an IP address SAN.
pub fn self_signed_for_ip(ip: IpAddr) -> Vec<u8> {
    let mut params = leaf_params(&[], None);
    params.subject_alt_names = vec![SanType::IpAddress(ip)];
    params.distinguished_name = named("ip host");
    let cert = Certificate::from_params(params).expect("ip cert");
    cert.serialize_der().expect("ip der")
}

/// Self-signed certificate with a subject CN and no SAN extension.
pub fn self_signed_cn_only(cn: &str) -> Vec<u8> {
    let mut params = leaf_params(&[], None);
    params.distinguished_name = named(cn);
    let cert = Certificate::from_params(params).expect("cn cert");
    cert.serialize_der().expect("cn der")
}

/// Leaf-first chain with a platform verdict.
pub fn trust(chain: Vec<Vec<u8>>, default_valid: bool) -> pe::CertificateChainTrust {
    pe::CertificateChainTrust::new(chain, default_valid)
}
