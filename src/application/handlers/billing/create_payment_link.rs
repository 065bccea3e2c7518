//! Payment link generation handler.
//!
//! Builds the hosted checkout URL the bot hands to a user. Under the
//! empty-invoice scheme the gateway assigns the invoice id itself, so the
//! link carries no `InvId` parameter and the signature leaves that slot
//! blank. `Shp_user_id` rides along so the result notification can be
//! attributed back to the user.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;
use url::Url;

use crate::domain::billing::{normalize_amount, SignatureCodec, SHP_USER_ID};
use crate::domain::foundation::UserId;

const HOSTED_CHECKOUT_URL: &str = "https://auth.robokassa.ru/Merchant/Index.aspx";
const FORM_CHECKOUT_URL: &str = "https://auth.robokassa.ru/Merchant/PaymentForm/FormMS.js";

/// A ready-to-use checkout link, in both the hosted-page and the
/// embeddable-form renditions.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentLink {
    pub hosted_url: String,
    pub form_url: String,
}

pub struct CreatePaymentLinkHandler {
    signature_codec: Arc<SignatureCodec>,
    price: String,
    test_mode: bool,
}

impl CreatePaymentLinkHandler {
    pub fn new(signature_codec: Arc<SignatureCodec>, price: String, test_mode: bool) -> Self {
        // the signed amount must be canonical or the gateway echo will not
        // verify later
        let price = normalize_amount(&price).unwrap_or(price);
        Self {
            signature_codec,
            price,
            test_mode,
        }
    }

    pub fn handle(&self, user_id: UserId, description: &str) -> PaymentLink {
        // Shp_user_id rides on the link, so it must be in the digest too
        let mut shp_params = BTreeMap::new();
        shp_params.insert(SHP_USER_ID.to_string(), user_id.to_string());
        let signature = self
            .signature_codec
            .sign_outbound(&self.price, None, &shp_params);

        let build = |base: &str| {
            let mut url = Url::parse(base).expect("checkout URL is well-formed");
            {
                let mut pairs = url.query_pairs_mut();
                pairs
                    .append_pair("MerchantLogin", self.signature_codec.merchant_login())
                    .append_pair("OutSum", &self.price)
                    .append_pair("Description", description)
                    .append_pair("SignatureValue", &signature)
                    .append_pair(SHP_USER_ID, &user_id.to_string());
                if self.test_mode {
                    pairs.append_pair("IsTest", "1");
                }
            }
            String::from(url)
        };

        info!(%user_id, "payment link generated");
        PaymentLink {
            hosted_url: build(HOSTED_CHECKOUT_URL),
            form_url: build(FORM_CHECKOUT_URL),
        }
    }
}
