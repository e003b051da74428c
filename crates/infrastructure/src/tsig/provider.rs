use super::TsigError;
use hickory_proto::dnssec::rdata::tsig::{
    make_tsig_record, message_tbs, signed_bitmessage_to_buf, TsigAlgorithm, TSIG,
};
use hickory_proto::dnssec::rdata::DNSSECRData;
use hickory_proto::op::{Message, MessageSignature};
use hickory_proto::rr::{Name, Record};
use hmac::{Hmac, Mac};
use rustc_hash::FxHashMap;
use sha1::Sha1;
use sha2::{Sha224, Sha256, Sha384, Sha512};
use subtle::ConstantTimeEq;
use zonemux_application::TsigStatus;
use zonemux_domain::validators::fqdn;
use zonemux_domain::TsigKey;

macro_rules! hmac_with {
    ($digest:ty, $secret:expr, $data:expr) => {{
        let mut mac = <Hmac<$digest> as Mac>::new_from_slice($secret)
            .map_err(|e| TsigError::Malformed(e.to_string()))?;
        mac.update($data);
        mac.finalize().into_bytes().to_vec()
    }};
}

fn malformed(e: impl std::fmt::Display) -> TsigError {
    TsigError::Malformed(e.to_string())
}

fn tsig_rdata(record: &Record) -> Result<&TSIG, TsigError> {
    record
        .data()
        .as_dnssec()
        .and_then(DNSSECRData::as_tsig)
        .ok_or_else(|| malformed("not a TSIG record"))
}

/// Lowercase FQDN of the key owning `record`.
fn key_name(record: &Record) -> String {
    fqdn(&record.name().to_ascii())
}

/// Lowercase FQDN of the algorithm, e.g. `hmac-sha256.`
fn algorithm_name(tsig: &TSIG) -> String {
    fqdn(&tsig.algorithm().to_name().to_ascii())
}

/// Signs and verifies messages with the TSIG keys of one listener.
#[derive(Debug, Clone, Default)]
pub struct TsigProvider {
    keys: FxHashMap<String, TsigKey>,
}

impl TsigProvider {
    pub fn new(keys: FxHashMap<String, TsigKey>) -> Self {
        Self { keys }
    }

    pub fn from_keys(keys: impl IntoIterator<Item = TsigKey>) -> Self {
        Self {
            keys: keys.into_iter().map(|k| (k.name.clone(), k)).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// MAC over `data` with the key owning the TSIG record `tsig`.
    ///
    /// The stored algorithm must equal the record's algorithm exactly;
    /// otherwise the key counts as not found.
    pub fn generate(&self, data: &[u8], tsig: &Record) -> Result<Vec<u8>, TsigError> {
        let rdata = tsig_rdata(tsig)?;
        let name = key_name(tsig);
        let algorithm = algorithm_name(rdata);
        let key = self
            .keys
            .get(&name)
            .filter(|key| key.algorithm == algorithm)
            .ok_or(TsigError::KeyNotFound { name, algorithm })?;

        let secret = key.secret.as_slice();
        let digest = match key.algorithm.as_str() {
            "hmac-sha1." => hmac_with!(Sha1, secret, data),
            "hmac-sha224." => hmac_with!(Sha224, secret, data),
            "hmac-sha256." => hmac_with!(Sha256, secret, data),
            "hmac-sha384." => hmac_with!(Sha384, secret, data),
            "hmac-sha512." => hmac_with!(Sha512, secret, data),
            other => return Err(TsigError::UnknownAlgorithm(other.to_string())),
        };
        Ok(digest)
    }

    /// Check the MAC carried by `tsig` in constant time.
    pub fn verify(&self, data: &[u8], tsig: &Record) -> Result<(), TsigError> {
        let expected = self.generate(data, tsig)?;
        if bool::from(expected.as_slice().ct_eq(tsig_rdata(tsig)?.mac())) {
            Ok(())
        } else {
            Err(TsigError::BadSignature(key_name(tsig)))
        }
    }

    /// Append a TSIG record signed with `key_name` to `packet`.
    ///
    /// Responses pass the MAC of the request they answer.
    pub fn sign(
        &self,
        packet: &[u8],
        key_name: &str,
        time_signed: u64,
        fudge: u16,
        request_mac: Option<&[u8]>,
    ) -> Result<Vec<u8>, TsigError> {
        let key = self
            .keys
            .get(&fqdn(key_name))
            .ok_or_else(|| TsigError::KeyNotFound {
                name: key_name.to_string(),
                algorithm: String::new(),
            })?;

        let mut message = Message::from_vec(packet).map_err(malformed)?;
        let owner = Name::from_ascii(&key.name).map_err(malformed)?;
        let algorithm = TsigAlgorithm::from_name(
            Name::from_ascii(key.algorithm.trim_end_matches('.')).map_err(malformed)?,
        );
        let unsigned = TSIG::new(
            algorithm,
            time_signed,
            fudge,
            Vec::new(),
            message.id(),
            0,
            Vec::new(),
        );

        let mut tbs = Vec::new();
        if let Some(mac) = request_mac {
            let len = u16::try_from(mac.len()).map_err(malformed)?;
            tbs.extend_from_slice(&len.to_be_bytes());
            tbs.extend_from_slice(mac);
        }
        tbs.extend(message_tbs(&message, &unsigned, &owner).map_err(malformed)?);

        let pre_sign = make_tsig_record(owner.clone(), unsigned.clone());
        let mac = self.generate(&tbs, &pre_sign)?;
        message.add_tsig(make_tsig_record(owner, unsigned.set_mac(mac)));
        message.to_vec().map_err(malformed)
    }

    /// Verify the TSIG of a raw request, if it carries one.
    ///
    /// `now` is seconds since the epoch and is checked against the record's
    /// time and fudge.
    pub fn verify_packet(&self, packet: &[u8], now: u64) -> TsigStatus {
        match Message::from_vec(packet) {
            Ok(message) if matches!(message.signature(), MessageSignature::Tsig(_)) => {}
            Ok(_) => return TsigStatus::Unsigned,
            Err(e) => {
                return TsigStatus::Failed {
                    key: String::new(),
                    reason: malformed(e).to_string(),
                }
            }
        }

        let (tbs, record) = match signed_bitmessage_to_buf(packet, None, true) {
            Ok(found) => found,
            Err(e) => {
                return TsigStatus::Failed {
                    key: String::new(),
                    reason: malformed(e).to_string(),
                }
            }
        };

        let key = key_name(&record);
        let result = self.verify(&tbs, &record).and_then(|()| {
            let rdata = tsig_rdata(&record)?;
            if now.abs_diff(rdata.time()) > u64::from(rdata.fudge()) {
                Err(TsigError::BadTime(key.clone()))
            } else {
                Ok(())
            }
        });

        match result {
            Ok(()) => TsigStatus::Verified { key },
            Err(e) => TsigStatus::Failed {
                key,
                reason: e.to_string(),
            },
        }
    }
}
