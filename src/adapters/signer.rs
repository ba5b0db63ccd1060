use crate::models::Params;
use crate::traits::Signer;

/// Open API request signer.
///
/// Parameters are sorted by key and concatenated as `key1value1key2value2`,
/// percent-encoded, suffixed with the client secret, and MD5-hashed.
#[derive(Debug, Clone, Copy, Default)]
pub struct Md5Signer;

impl Signer for Md5Signer {
    fn sign(&self, params: &Params, secret: &str) -> String {
        // BTreeMap iterates in key order.
        let joined: String = params
            .iter()
            .filter(|(key, _)| key.as_str() != "sign")
            .map(|(key, value)| format!("{}{}", key, value))
            .collect();
        let payload = format!("{}{}", urlencoding::encode(&joined), secret);
        format!("{:x}", md5::compute(payload.as_bytes()))
    }
}
