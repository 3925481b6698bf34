use bytes::Bytes;
use hex::FromHex;
use sha1::{Digest, Sha1};
use sha1::digest::consts::U20;
use sha1::digest::generic_array::GenericArray;
use tracing::trace;

/// Incrementally hashes downloaded data and compares the result with an expected hash once all
///  data was seen
pub trait ChecksumValidator: Send {
    fn algorithm(&self) -> &'static str;
    fn add_data(&mut self, data: &Bytes);
    fn do_validate(&self) -> bool;
}

pub struct Sha1Validator {
    hasher: Sha1,
    expected_hash: GenericArray<u8, U20>,
}
impl Sha1Validator {
    pub fn new(expected_hash: [u8; 20]) -> Sha1Validator {
        Sha1Validator {
            hasher: Default::default(),
            expected_hash: expected_hash.into(),
        }
    }
}
impl ChecksumValidator for Sha1Validator {
    fn algorithm(&self) -> &'static str {
        "SHA-1"
    }

    fn add_data(&mut self, data: &Bytes) {
        self.hasher.update(data);
    }

    fn do_validate(&self) -> bool {
        let hash = self.hasher.clone().finalize();
        trace!("validating SHA1 hash");
        hash == self.expected_hash
    }
}

pub struct Md5Validator {
    context: md5::Context,
    expected_hash: [u8; 16],
}
impl Md5Validator {
    pub fn new(expected_hash: [u8; 16]) -> Md5Validator {
        Md5Validator {
            context: md5::Context::new(),
            expected_hash,
        }
    }
}
impl ChecksumValidator for Md5Validator {
    fn algorithm(&self) -> &'static str {
        "MD5"
    }

    fn add_data(&mut self, data: &Bytes) {
        self.context.consume(data);
    }

    fn do_validate(&self) -> bool {
        let hash: [u8;16] = self.context.clone()
            .compute()
            .into();
        trace!("validating MD5 hash");
        hash == self.expected_hash
    }
}

/// Parses the content of a `.sha1` file. These contain the hex encoded hash, optionally followed
///  by whitespace and a file name.
pub fn parse_sha1_file(content: &str) -> anyhow::Result<[u8; 20]> {
    let hex_string = content.split_whitespace()
        .next()
        .unwrap_or("");
    Ok(<[u8; 20]>::from_hex(hex_string)?)
}
