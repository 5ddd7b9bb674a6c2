//! Key derivation, fulfillment generation and AES-256-GCM encryption for
//! STREAM.

use bytes::BytesMut;
use ring::rand::{SecureRandom, SystemRandom};
use ring::{aead, digest, hmac};
use thiserror::Error;

const NONCE_LENGTH: usize = 12;
const AUTH_TAG_LENGTH: usize = 16;

static ENCRYPTION_KEY_STRING: &[u8] = b"ilp_stream_encryption";
static FULFILLMENT_GENERATION_STRING: &[u8] = b"ilp_stream_fulfillment";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("unable to generate random bytes")]
    Random,
    #[error("ciphertext is too short")]
    TooShort,
    #[error("unable to encrypt data")]
    Seal,
    #[error("unable to decrypt data")]
    Open,
}

pub fn hmac_sha256(key: &[u8], message: &[u8]) -> [u8; 32] {
    let key = hmac::Key::new(hmac::HMAC_SHA256, key);
    let output = hmac::sign(&key, message);
    let mut to_return = [0; 32];
    to_return.copy_from_slice(output.as_ref());
    to_return
}

pub fn hash_sha256(preimage: &[u8]) -> [u8; 32] {
    let output = digest::digest(&digest::SHA256, preimage);
    let mut to_return = [0; 32];
    to_return.copy_from_slice(output.as_ref());
    to_return
}

pub fn generate_fulfillment(shared_secret: &[u8], data: &[u8]) -> [u8; 32] {
    let key = hmac_sha256(shared_secret, FULFILLMENT_GENERATION_STRING);
    hmac_sha256(&key, data)
}

pub fn generate_condition(shared_secret: &[u8], data: &[u8]) -> [u8; 32] {
    hash_sha256(&generate_fulfillment(shared_secret, data))
}

pub fn random_bytes<const N: usize>() -> Result<[u8; N], CryptoError> {
    let mut bytes = [0; N];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| CryptoError::Random)?;
    Ok(bytes)
}

/// Encrypts `plaintext` with a key derived from `shared_secret`.
/// The output is laid out as `nonce || auth tag || ciphertext`.
pub fn encrypt(shared_secret: &[u8], plaintext: BytesMut) -> Result<BytesMut, CryptoError> {
    encrypt_with_aad(shared_secret, plaintext, &[])
}

pub fn decrypt(shared_secret: &[u8], ciphertext: BytesMut) -> Result<BytesMut, CryptoError> {
    decrypt_with_aad(shared_secret, ciphertext, &[])
}

/// Like [`encrypt`], additionally authenticating `aad` without encrypting it.
pub fn encrypt_with_aad(
    shared_secret: &[u8],
    plaintext: BytesMut,
    aad: &[u8],
) -> Result<BytesMut, CryptoError> {
    let nonce = random_bytes::<NONCE_LENGTH>()?;
    encrypt_with_nonce(shared_secret, plaintext, aad, nonce)
}

fn encryption_key(shared_secret: &[u8]) -> Result<aead::LessSafeKey, CryptoError> {
    let key = hmac_sha256(shared_secret, ENCRYPTION_KEY_STRING);
    let key = aead::UnboundKey::new(&aead::AES_256_GCM, &key).map_err(|_| CryptoError::Seal)?;
    Ok(aead::LessSafeKey::new(key))
}

fn encrypt_with_nonce(
    shared_secret: &[u8],
    mut plaintext: BytesMut,
    aad: &[u8],
    nonce: [u8; NONCE_LENGTH],
) -> Result<BytesMut, CryptoError> {
    let key = encryption_key(shared_secret)?;
    key.seal_in_place_append_tag(
        aead::Nonce::assume_unique_for_key(nonce),
        aead::Aad::from(aad),
        &mut plaintext,
    )
    .map_err(|_| CryptoError::Seal)?;

    // ring appends the tag, the wire format puts it before the data
    let tag_position = plaintext.len() - AUTH_TAG_LENGTH;
    let tag = plaintext.split_off(tag_position);

    let mut output = BytesMut::with_capacity(NONCE_LENGTH + plaintext.len() + AUTH_TAG_LENGTH);
    output.extend_from_slice(&nonce);
    output.extend_from_slice(&tag);
    output.extend_from_slice(&plaintext);
    Ok(output)
}

pub fn decrypt_with_aad(
    shared_secret: &[u8],
    mut ciphertext: BytesMut,
    aad: &[u8],
) -> Result<BytesMut, CryptoError> {
    if ciphertext.len() < NONCE_LENGTH + AUTH_TAG_LENGTH {
        return Err(CryptoError::TooShort);
    }
    let key = encryption_key(shared_secret)?;

    let mut nonce = [0; NONCE_LENGTH];
    nonce.copy_from_slice(&ciphertext.split_to(NONCE_LENGTH));
    // ring expects the tag after the ciphertext
    ciphertext.rotate_left(AUTH_TAG_LENGTH);

    let length = key
        .open_in_place(
            aead::Nonce::assume_unique_for_key(nonce),
            aead::Aad::from(aad),
            &mut ciphertext,
        )
        .map_err(|_| CryptoError::Open)?
        .len();
    ciphertext.truncate(length);
    Ok(ciphertext)
}
