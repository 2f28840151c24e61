//! Media host request authentication
//!
//! SPDX-License-Identifier: GPL-3.0-or-later

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::fmt::Write;
use std::io;

/// Key pair issued by the media host. The secret must never leave a trusted machine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiCredentials {
    pub api_key: String,
    pub api_secret: String,
}

/// Parses credentials stored as `API_KEY:API_SECRET`.
pub fn parse_api_credentials(credentials: Vec<u8>) -> io::Result<ApiCredentials> {
    let key_secret = String::from_utf8(credentials)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;

    let (api_key, api_secret) = key_secret.trim().split_once(':').ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidData, "Invalid credentials".to_string())
    })?;

    if api_key.is_empty() || api_secret.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "Invalid credentials".to_string(),
        ));
    }

    Ok(ApiCredentials {
        api_key: api_key.to_string(),
        api_secret: api_secret.to_string(),
    })
}

/// Signs a set of request parameters the way the media host expects:
/// parameters sorted by name, serialized as `k=v` pairs joined by `&`,
/// the secret appended, and the whole string hashed with SHA-1 (lowercase hex).
///
/// `file`, `api_key`, `resource_type` and `signature` are never part of the signed string.
pub fn sign_params(params: &[(&str, String)], api_secret: &str) -> String {
    let mut signed: Vec<&(&str, String)> = params
        .iter()
        .filter(|(name, value)| {
            !value.is_empty()
                && !matches!(*name, "file" | "api_key" | "resource_type" | "signature")
        })
        .collect();
    signed.sort_by(|a, b| a.0.cmp(b.0));

    let to_sign = signed
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join("&");

    sha1_hex(format!("{}{}", to_sign, api_secret).as_bytes())
}

/// Builds the complete form for a signed destroy call.
pub fn signed_destroy_params(
    public_id: &str,
    timestamp: i64,
    credentials: &ApiCredentials,
) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("public_id", public_id.to_string()),
        ("timestamp", timestamp.to_string()),
    ];
    let signature = sign_params(&params, &credentials.api_secret);
    params.push(("api_key", credentials.api_key.clone()));
    params.push(("signature", signature));
    params
}

fn sha1_hex(bytes: &[u8]) -> String {
    let mut h = Sha1::new();
    h.update(bytes);
    let out = h.finalize();

    let mut s = String::with_capacity(out.len() * 2);
    for b in out {
        // Writing into a String cannot fail.
        let _ = write!(&mut s, "{:02x}", b);
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_key_and_secret() {
        let creds = parse_api_credentials(b"269242833568928:s3cr3t\n".to_vec()).unwrap();
        assert_eq!(creds.api_key, "269242833568928");
        assert_eq!(creds.api_secret, "s3cr3t");
    }

    #[test]
    fn rejects_credentials_without_separator() {
        let err = parse_api_credentials(b"justakey".to_vec()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(parse_api_credentials(b":secret".to_vec()).is_err());
    }

    #[test]
    fn empty_parameter_set_hashes_only_the_secret() {
        assert_eq!(
            sign_params(&[], "abc"),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
    }

    #[test]
    fn signature_ignores_parameter_order_and_excluded_fields() {
        let a = sign_params(
            &[
                ("timestamp", "1315060510".to_string()),
                ("public_id", "sample".to_string()),
            ],
            "abcd",
        );
        let b = sign_params(
            &[
                ("public_id", "sample".to_string()),
                ("api_key", "ignored".to_string()),
                ("timestamp", "1315060510".to_string()),
            ],
            "abcd",
        );
        assert_eq!(a, b);
        assert_eq!(a.len(), 40);
    }

    #[test]
    fn destroy_params_carry_key_and_signature() {
        let creds = ApiCredentials {
            api_key: "key".to_string(),
            api_secret: "secret".to_string(),
        };
        let params = signed_destroy_params("sentinel-videos/abc", 1_700_000_000, &creds);
        let names: Vec<&str> = params.iter().map(|(n, _)| *n).collect();
        assert_eq!(names, ["public_id", "timestamp", "api_key", "signature"]);

        let expected = sign_params(
            &[
                ("public_id", "sentinel-videos/abc".to_string()),
                ("timestamp", "1700000000".to_string()),
            ],
            "secret",
        );
        assert_eq!(params[3].1, expected);
    }
}
