use crate::{
    compose::{Feature, FeatureSet},
    error::WasiError,
    fs::MemoryFileSystem,
    providers::stdio::{Readable, Writable},
};

/// A source of cryptographically secure random bytes for `random_get`.
///
/// The default implementation uses the host's CSPRNG via the `rand` crate;
/// embedders that need determinism (fuzzing, replay) can supply their own.
pub trait RandomSource: Send {
    fn fill(&mut self, bytes: &mut [u8]);
}

pub(crate) struct OsRandom;

impl RandomSource for OsRandom {
    fn fill(&mut self, bytes: &mut [u8]) {
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), bytes);
    }
}

/// The immutable configuration and mutable runtime state a guest instance
/// is linked against.
///
/// A `WasiCtx` is produced by [`WasiCtxBuilder::build`] and is meant to live
/// inside a `wasmi::Store<WasiCtx>` for the lifetime of one guest instance.
pub struct WasiCtx {
    pub(crate) args: Vec<String>,
    pub(crate) env: Vec<(String, String)>,
    pub(crate) features: FeatureSet,
    pub(crate) fs: MemoryFileSystem,
    pub(crate) random: Box<dyn RandomSource>,
    pub(crate) start_instant: std::time::Instant,
    pub(crate) started: bool,
    pub(crate) initialized: bool,
}

impl WasiCtx {
    /// Returns the file system this context owns, for embedders that want
    /// to seed files or inspect output after a run.
    pub fn file_system(&mut self) -> &mut MemoryFileSystem {
        &mut self.fs
    }
}

/// Builds a [`WasiCtx`].
///
/// Mirrors the "accumulate, then validate on `build`" ergonomics familiar
/// from other WASI host implementations: none of the fluent setters can
/// fail, only [`WasiCtxBuilder::build`] can.
pub struct WasiCtxBuilder {
    args: Vec<String>,
    env: Vec<(String, String)>,
    features: Vec<Feature>,
    fs: MemoryFileSystem,
    random: Box<dyn RandomSource>,
    preopens: Vec<String>,
}

impl WasiCtxBuilder {
    pub fn new() -> Self {
        Self {
            args: Vec::new(),
            env: Vec::new(),
            features: Vec::new(),
            fs: MemoryFileSystem::new(),
            random: Box::new(OsRandom),
            preopens: Vec::new(),
        }
    }

    /// Appends command-line arguments, in order. Call at most once; later
    /// calls append rather than replace.
    pub fn args<I, S>(mut self, args: I) -> Result<Self, WasiError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        Ok(self)
    }

    /// Adds one `KEY=VALUE` environment entry.
    ///
    /// # Errors
    ///
    /// Fails at [`Self::build`] time, not here, if `key` contains `=` or a
    /// NUL byte.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Result<Self, WasiError> {
        self.env.push((key.into(), value.into()));
        Ok(self)
    }

    /// Enables a feature. See [`Feature`] for what each variant provides.
    pub fn feature(mut self, feature: Feature) -> Self {
        self.features.push(feature);
        self
    }

    /// Enables every feature this core ships (without tracing).
    pub fn inherit_all(mut self) -> Self {
        self.features.extend([
            Feature::Args,
            Feature::Environ,
            Feature::Clock,
            Feature::Proc,
            Feature::Random,
            Feature::Fs,
        ]);
        self
    }

    /// Shorthand for [`Feature::Stdio`] wired to the process's own stdio.
    pub fn inherit_stdio(mut self) -> Self {
        self.features.push(Feature::Stdio);
        self
    }

    /// Overrides stdin with a custom [`Readable`].
    pub fn stdin(mut self, reader: impl Readable + 'static) -> Self {
        self.fs.set_stdin(Box::new(reader));
        self
    }

    /// Overrides stdout with a custom [`Writable`].
    pub fn stdout(mut self, writer: impl Writable + 'static) -> Self {
        self.fs.set_stdout(Box::new(writer));
        self
    }

    /// Overrides stderr with a custom [`Writable`].
    pub fn stderr(mut self, writer: impl Writable + 'static) -> Self {
        self.fs.set_stderr(Box::new(writer));
        self
    }

    /// Registers `guest_path` as a preopened directory. Enables
    /// [`Feature::Fs`] implicitly.
    ///
    /// # Errors
    ///
    /// Fails at [`Self::build`] time if two preopens resolve to the same
    /// guest path.
    pub fn preopened_dir(mut self, guest_path: impl Into<String>) -> Result<Self, WasiError> {
        self.preopens.push(guest_path.into());
        self.features.push(Feature::Fs);
        Ok(self)
    }

    /// Seeds a regular file at `guest_path` before the guest ever runs.
    pub fn file(mut self, guest_path: impl AsRef<str>, content: impl Into<Vec<u8>>) -> Self {
        self.fs.write_file(guest_path.as_ref(), content);
        self
    }

    /// Overrides the random source used by `random_get`.
    pub fn random(mut self, source: impl RandomSource + 'static) -> Self {
        self.random = Box::new(source);
        self
    }

    /// Validates the accumulated configuration and produces a [`WasiCtx`].
    ///
    /// # Errors
    ///
    /// - Any environment key contains `=` or a NUL byte.
    /// - Two [`Self::preopened_dir`] calls resolve to the same guest path.
    pub fn build(self) -> Result<WasiCtx, WasiError> {
        for (key, _) in &self.env {
            if key.contains('=') || key.contains('\0') {
                return Err(WasiError::config(format!(
                    "invalid environment variable key: {key:?}"
                )));
            }
        }
        if self.args.is_empty() {
            // Conventionally argv[0] is the program name; an empty argv is
            // legal but unusual, so we don't synthesize one here and leave
            // it to the embedder to decide.
        }
        let mut seen = std::collections::HashSet::new();
        for guest_path in &self.preopens {
            let normalized = crate::fs::path::normalize(guest_path);
            if !seen.insert(normalized.clone()) {
                return Err(WasiError::config(format!(
                    "duplicate preopen guest path: {normalized:?}"
                )));
            }
        }
        let features = FeatureSet::resolve(&self.features);
        let mut fs = self.fs;
        if features.fs && self.preopens.is_empty() {
            // No explicit preopens: `/` is the sole preopen, per the memory
            // file system's design notes.
            fs.register_preopen("/");
        } else {
            for guest_path in &self.preopens {
                fs.register_preopen(guest_path);
            }
        }
        Ok(WasiCtx {
            args: self.args,
            env: self.env,
            features,
            fs,
            random: self.random,
            start_instant: std::time::Instant::now(),
            started: false,
            initialized: false,
        })
    }
}

impl Default for WasiCtxBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn build_rejects_env_key_with_equals_sign() {
        let result = WasiCtxBuilder::new().env("BAD=KEY", "v").unwrap().build();
        assert_matches!(result, Err(WasiError::Config(_)));
    }

    #[test]
    fn build_rejects_env_key_with_nul_byte() {
        let result = WasiCtxBuilder::new().env("BAD\0KEY", "v").unwrap().build();
        assert_matches!(result, Err(WasiError::Config(_)));
    }

    #[test]
    fn build_rejects_duplicate_preopen_paths() {
        let result = WasiCtxBuilder::new()
            .preopened_dir("/sandbox")
            .unwrap()
            .preopened_dir("/sandbox/")
            .unwrap()
            .build();
        assert_matches!(result, Err(WasiError::Config(_)));
    }

    #[test]
    fn build_accepts_distinct_preopen_paths() {
        let result = WasiCtxBuilder::new()
            .preopened_dir("/a")
            .unwrap()
            .preopened_dir("/b")
            .unwrap()
            .build();
        assert_matches!(result, Ok(_));
    }
}
