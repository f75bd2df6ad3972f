// Wrapper for sha256 libraries.
// Every merkle node and every 16 KiB leaf block goes through here, so this is
// where most of the CPU time of tree verification is spent. The system
// library is the default, openssl and the pure-rust impl are selectable with
// features.

assert_cfg::exactly_one! {
    feature = "sha256-crypto-hash",
    feature = "sha256-openssl",
    feature = "sha256-rust",
}

#[cfg(feature = "sha256-openssl")]
pub type Sha256 = Sha256Openssl;

#[cfg(feature = "sha256-rust")]
pub type Sha256 = Sha256Rust;

#[cfg(feature = "sha256-crypto-hash")]
pub type Sha256 = Sha256System;

pub trait ISha256 {
    fn new() -> Self;
    fn update(&mut self, buf: &[u8]);
    fn finish(self) -> [u8; 32];
}

#[cfg(feature = "sha256-rust")]
pub struct Sha256Rust {
    inner: sha2::Sha256,
}

#[cfg(feature = "sha256-rust")]
impl ISha256 for Sha256Rust {
    fn new() -> Self {
        use sha2::Digest;
        Sha256Rust {
            inner: sha2::Sha256::new(),
        }
    }

    fn update(&mut self, buf: &[u8]) {
        sha2::Digest::update(&mut self.inner, buf)
    }

    fn finish(self) -> [u8; 32] {
        sha2::Digest::finalize(self.inner).into()
    }
}

#[cfg(feature = "sha256-openssl")]
pub struct Sha256Openssl {
    inner: openssl::sha::Sha256,
}

#[cfg(feature = "sha256-openssl")]
impl ISha256 for Sha256Openssl {
    fn new() -> Self {
        Self {
            inner: openssl::sha::Sha256::new(),
        }
    }

    fn update(&mut self, buf: &[u8]) {
        self.inner.update(buf)
    }

    fn finish(self) -> [u8; 32] {
        self.inner.finish()
    }
}

#[cfg(feature = "sha256-crypto-hash")]
pub struct Sha256System {
    inner: crypto_hash::Hasher,
}

#[cfg(feature = "sha256-crypto-hash")]
impl ISha256 for Sha256System {
    fn new() -> Self {
        Self {
            inner: crypto_hash::Hasher::new(crypto_hash::Algorithm::SHA256),
        }
    }

    fn update(&mut self, buf: &[u8]) {
        use std::io::Write;
        // Writing into an in-memory hasher never fails.
        self.inner.write_all(buf).unwrap();
    }

    fn finish(mut self) -> [u8; 32] {
        let result = self.inner.finish();
        debug_assert_eq!(result.len(), 32);
        let mut result_arr = [0u8; 32];
        result_arr.copy_from_slice(&result);
        result_arr
    }
}
