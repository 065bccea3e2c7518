//! Payment gateway signature computation and verification.
//!
//! The gateway signs with MD5 over colon-joined fields, rendered as
//! lowercase hex. Outbound links are signed with the first shared secret,
//! inbound result notifications with the second. Custom `Shp_` parameters
//! participate in the inbound digest sorted ascending by parameter name
//! and appended as `:name=value` pairs.

use std::collections::BTreeMap;

use md5::{Digest, Md5};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

/// How the invoice id slot is filled when signing an outbound payment link.
///
/// With [`SigningScheme::EmptyInvoice`] the gateway assigns the invoice id
/// itself and the signed base leaves the slot empty (a double colon). With
/// [`SigningScheme::PopulatedInvoice`] the merchant pre-assigns the id and
/// signs it into the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SigningScheme {
    #[default]
    EmptyInvoice,
    PopulatedInvoice,
}

/// Computes and verifies gateway signatures for one merchant account.
pub struct SignatureCodec {
    merchant_login: String,
    outbound_secret: SecretString,
    inbound_secret: SecretString,
    scheme: SigningScheme,
}

impl SignatureCodec {
    pub fn new(
        merchant_login: impl Into<String>,
        outbound_secret: SecretString,
        inbound_secret: SecretString,
        scheme: SigningScheme,
    ) -> Self {
        Self {
            merchant_login: merchant_login.into(),
            outbound_secret,
            inbound_secret,
            scheme,
        }
    }

    pub fn merchant_login(&self) -> &str {
        &self.merchant_login
    }

    pub fn scheme(&self) -> SigningScheme {
        self.scheme
    }

    /// Signs an outbound payment link.
    ///
    /// `invoice_id` is only signed under [`SigningScheme::PopulatedInvoice`];
    /// otherwise the slot stays empty regardless of the argument. Any
    /// `Shp_` parameter carried on the link must also appear in
    /// `shp_params`: the gateway recomputes the digest over them, sorted
    /// ascending by name, on its side.
    pub fn sign_outbound(
        &self,
        amount: &str,
        invoice_id: Option<&str>,
        shp_params: &BTreeMap<String, String>,
    ) -> String {
        let invoice_slot = match self.scheme {
            SigningScheme::PopulatedInvoice => invoice_id.unwrap_or(""),
            SigningScheme::EmptyInvoice => "",
        };
        let mut base = format!(
            "{}:{}:{}:{}",
            self.merchant_login,
            amount,
            invoice_slot,
            self.outbound_secret.expose_secret()
        );
        for (name, value) in shp_params {
            base.push(':');
            base.push_str(name);
            base.push('=');
            base.push_str(value);
        }
        md5_hex(&base)
    }

    /// Verifies the signature of an inbound result notification.
    ///
    /// `shp_params` must hold every `Shp_`-prefixed parameter the gateway
    /// echoed back; the BTreeMap ordering gives the required ascending sort.
    /// Comparison is case-insensitive on the hex digest and constant-time.
    pub fn verify_inbound(
        &self,
        amount: &str,
        invoice_id: &str,
        shp_params: &BTreeMap<String, String>,
        received: &str,
    ) -> bool {
        let mut base = format!(
            "{}:{}:{}",
            amount,
            invoice_id,
            self.inbound_secret.expose_secret()
        );
        for (name, value) in shp_params {
            base.push(':');
            base.push_str(name);
            base.push('=');
            base.push_str(value);
        }
        digests_match(&md5_hex(&base), received)
    }
}

fn md5_hex(input: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

fn digests_match(expected: &str, received: &str) -> bool {
    let received = received.to_ascii_lowercase();
    if expected.len() != received.len() {
        return false;
    }
    expected.as_bytes().ct_eq(received.as_bytes()).into()
}
