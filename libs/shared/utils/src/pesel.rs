use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::NaiveDate;
use hmac::{Hmac, Mac};
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

const TAG_LEN: usize = 16;

#[derive(Error, Debug, PartialEq)]
pub enum PeselError {
    #[error("PESEL key is not configured")]
    MissingKey,

    #[error("Encryption key must be 32 bytes encoded as base64")]
    InvalidKey,

    #[error("Encrypted payload is malformed")]
    InvalidPayload,

    #[error("Encryption failed")]
    Crypto,

    #[error("PESEL does not encode a valid birth date")]
    InvalidBirthDate,
}

pub fn is_valid_format(pesel: &str) -> bool {
    pesel.len() == 11 && pesel.chars().all(|c| c.is_ascii_digit())
}

/// Deterministic lookup value for PESEL comparisons.
pub fn pesel_hmac(key: &str, pesel: &str) -> Result<String, PeselError> {
    if key.is_empty() {
        return Err(PeselError::MissingKey);
    }
    let mut mac = HmacSha256::new_from_slice(key.as_bytes()).map_err(|_| PeselError::InvalidKey)?;
    mac.update(pesel.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// AES-256-GCM; the payload is base64(iv | tag | ciphertext).
pub fn encrypt_pesel(key_b64: &str, pesel: &str) -> Result<String, PeselError> {
    let key = load_key(key_b64)?;

    let mut iv = [0u8; NONCE_LEN];
    SystemRandom::new().fill(&mut iv).map_err(|_| PeselError::Crypto)?;

    let mut in_out = pesel.as_bytes().to_vec();
    let tag = key
        .seal_in_place_separate_tag(Nonce::assume_unique_for_key(iv), Aad::empty(), &mut in_out)
        .map_err(|_| PeselError::Crypto)?;

    let mut payload = Vec::with_capacity(NONCE_LEN + TAG_LEN + in_out.len());
    payload.extend_from_slice(&iv);
    payload.extend_from_slice(tag.as_ref());
    payload.extend_from_slice(&in_out);

    Ok(STANDARD.encode(payload))
}

pub fn decrypt_pesel(key_b64: &str, payload_b64: &str) -> Result<String, PeselError> {
    let key = load_key(key_b64)?;
    let payload = STANDARD
        .decode(payload_b64)
        .map_err(|_| PeselError::InvalidPayload)?;

    if payload.len() <= NONCE_LEN + TAG_LEN {
        return Err(PeselError::InvalidPayload);
    }

    let (iv, rest) = payload.split_at(NONCE_LEN);
    let (tag, ciphertext) = rest.split_at(TAG_LEN);
    let nonce = Nonce::try_assume_unique_for_key(iv).map_err(|_| PeselError::InvalidPayload)?;

    let mut buffer = ciphertext.to_vec();
    buffer.extend_from_slice(tag);
    let plain = key
        .open_in_place(nonce, Aad::empty(), &mut buffer)
        .map_err(|_| PeselError::InvalidPayload)?;

    String::from_utf8(plain.to_vec()).map_err(|_| PeselError::InvalidPayload)
}

/// Birth date encoded in the first six digits; the month offset selects the century.
pub fn birth_date_from_pesel(pesel: &str) -> Result<NaiveDate, PeselError> {
    if !is_valid_format(pesel) {
        return Err(PeselError::InvalidBirthDate);
    }

    let year_part: i32 = pesel[0..2].parse().map_err(|_| PeselError::InvalidBirthDate)?;
    let month_part: u32 = pesel[2..4].parse().map_err(|_| PeselError::InvalidBirthDate)?;
    let day: u32 = pesel[4..6].parse().map_err(|_| PeselError::InvalidBirthDate)?;

    let (century, month) = match month_part {
        m if m > 80 => (1800, m - 80),
        m if m > 60 => (2200, m - 60),
        m if m > 40 => (2100, m - 40),
        m if m > 20 => (2000, m - 20),
        m => (1900, m),
    };

    NaiveDate::from_ymd_opt(century + year_part, month, day).ok_or(PeselError::InvalidBirthDate)
}

fn load_key(key_b64: &str) -> Result<LessSafeKey, PeselError> {
    if key_b64.is_empty() {
        return Err(PeselError::MissingKey);
    }
    let bytes = STANDARD.decode(key_b64).map_err(|_| PeselError::InvalidKey)?;
    if bytes.len() != 32 {
        return Err(PeselError::InvalidKey);
    }
    let unbound = UnboundKey::new(&AES_256_GCM, &bytes).map_err(|_| PeselError::InvalidKey)?;
    Ok(LessSafeKey::new(unbound))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> String {
        STANDARD.encode([7u8; 32])
    }

    #[test]
    fn encrypt_then_decrypt() {
        let payload = encrypt_pesel(&key(), "90010112345").unwrap();
        assert_eq!(decrypt_pesel(&key(), &payload).unwrap(), "90010112345");
    }

    #[test]
    fn encryption_is_randomized() {
        let a = encrypt_pesel(&key(), "90010112345").unwrap();
        let b = encrypt_pesel(&key(), "90010112345").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn short_payload_is_rejected() {
        let short = STANDARD.encode([0u8; 28]);
        assert_eq!(decrypt_pesel(&key(), &short), Err(PeselError::InvalidPayload));
    }

    #[test]
    fn wrong_key_length_is_rejected() {
        let bad = STANDARD.encode([1u8; 16]);
        assert_eq!(encrypt_pesel(&bad, "90010112345"), Err(PeselError::InvalidKey));
    }

    #[test]
    fn hmac_is_stable_hex() {
        let a = pesel_hmac("secret", "90010112345").unwrap();
        let b = pesel_hmac("secret", "90010112345").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, pesel_hmac("secret", "90010112346").unwrap());
    }

    #[test]
    fn birth_dates_by_century() {
        assert_eq!(
            birth_date_from_pesel("90010112345").unwrap(),
            NaiveDate::from_ymd_opt(1990, 1, 1).unwrap()
        );
        assert_eq!(
            birth_date_from_pesel("05231512345").unwrap(),
            NaiveDate::from_ymd_opt(2005, 3, 15).unwrap()
        );
        assert_eq!(
            birth_date_from_pesel("99920112345").unwrap(),
            NaiveDate::from_ymd_opt(1899, 12, 1).unwrap()
        );
        assert_eq!(
            birth_date_from_pesel("90023112345"),
            Err(PeselError::InvalidBirthDate)
        );
    }

    #[test]
    fn format_requires_eleven_digits() {
        assert!(is_valid_format("90010112345"));
        assert!(!is_valid_format("9001011234"));
        assert!(!is_valid_format("9001011234a"));
    }
}
