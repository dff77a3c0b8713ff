// THEORY:
// The `lame` module is the process half of the channel codec bridge. The core of
// the effect only needs a way to push bytes through a lossy codec and get bytes
// back; that need is the `LossyRoundTrip` trait. `LameRoundTrip` fulfils it by
// shelling out to the `lame` MP3 encoder twice (encode, then decode) through a
// triplet of scratch files.
//
// Key architectural principles:
// 1.  **Capability seam**: The operator holds an `Arc<dyn LossyRoundTrip>`, so
//     tests can swap the external tool for an identity fake and exercise the
//     array logic without a codec installed.
// 2.  **Scoped scratch files**: Every file a round trip creates is owned by a
//     `ScratchFile` guard that deletes it when dropped, whether the call
//     succeeded or failed. A persistent scratch space (a caller-supplied temp
//     directory) disables deletion so intermediate files can be inspected.
// 3.  **Unique names by scope**: Each run gets its own directory and each round
//     trip a sequence number from an atomic counter, so three concurrent channel
//     tasks never collide.
// 4.  **Fail loudly**: A non-zero exit from either codec step is an error for
//     that channel. Nothing is retried.

use crate::core_modules::channel_codec::recover_samples;
use crate::error::{GleitzschError, Result};
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Name of the codec executable looked up on `PATH`.
pub const LAME_EXECUTABLE: &str = "lame";

/// Raw 8-bit input at 8 kHz, best quality, bitrate between 8 and 16 kbps.
const ENCODE_ARGS: &[&str] = &[
    "-r",
    "-s",
    "8",
    "-q",
    "1",
    "--highpass-width",
    "--lowpass-width",
    "--bitwidth",
    "8",
    "-b",
    "8",
    "-B",
    "16",
    "-m",
    "f",
];

/// Silent headerless decode with swapped byte order.
const DECODE_ARGS: &[&str] = &["-S", "--decode", "--brief", "-x", "-t"];

/// Pushes a byte sequence through a lossy codec and back.
///
/// Implementations must return exactly `samples.len()` bytes.
pub trait LossyRoundTrip: Send + Sync {
    fn round_trip(&self, samples: &[u8]) -> Result<Vec<u8>>;
}

/// Passes bytes through untouched. Useful for testing the surrounding pipeline.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityRoundTrip;

impl LossyRoundTrip for IdentityRoundTrip {
    fn round_trip(&self, samples: &[u8]) -> Result<Vec<u8>> {
        Ok(samples.to_vec())
    }
}

/// Program asked to resolve the codec on `PATH`.
const LOOKUP_PROGRAM: &str = "which";

/// Looks `executable` up on the search path with `which`.
///
/// This is the startup check: a missing codec aborts the run before any image
/// work is attempted. When `which` itself cannot be run the error is
/// `LookupUnavailable`, not `CodecNotFound`.
pub fn locate_codec(executable: &str) -> Result<PathBuf> {
    locate_with(LOOKUP_PROGRAM, executable)
}

fn locate_with(lookup: &str, executable: &str) -> Result<PathBuf> {
    let output = Command::new(lookup)
        .arg(executable)
        .output()
        .map_err(|source| GleitzschError::LookupUnavailable {
            lookup: lookup.to_string(),
            executable: executable.to_string(),
            source,
        })?;

    let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if !output.status.success() || path.is_empty() {
        return Err(GleitzschError::CodecNotFound(executable.to_string()));
    }
    Ok(PathBuf::from(path))
}

/// Where a run keeps its intermediate files.
#[derive(Debug)]
pub enum ScratchSpace {
    /// Auto-generated directory, removed with everything in it when dropped.
    Ephemeral(TempDir),
    /// A `run-*` directory inside a caller-supplied location. Kept, files included.
    Persistent(PathBuf),
}

impl ScratchSpace {
    /// Creates the scratch space for one run.
    ///
    /// With `Some(dir)`, a fresh subdirectory is created inside `dir` (which is
    /// created if needed) and nothing written there is ever deleted.
    pub fn new(requested: Option<&Path>) -> Result<Self> {
        match requested {
            None => {
                let dir = tempfile::Builder::new().prefix("gleitzsch-").tempdir()?;
                Ok(Self::Ephemeral(dir))
            }
            Some(root) => {
                fs::create_dir_all(root)?;
                let dir = tempfile::Builder::new().prefix("run-").tempdir_in(root)?;
                Ok(Self::Persistent(dir.keep()))
            }
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Ephemeral(dir) => dir.path(),
            Self::Persistent(path) => path.as_path(),
        }
    }

    pub fn keeps_files(&self) -> bool {
        matches!(self, Self::Persistent(_))
    }
}

/// Paths of the three intermediate files of one round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScratchPaths {
    pub input: PathBuf,
    pub encoded: PathBuf,
    pub decoded: PathBuf,
}

impl ScratchPaths {
    /// Names the triplet for round trip number `sequence` inside `dir`.
    pub fn for_sequence(dir: &Path, sequence: usize) -> Self {
        Self {
            input: dir.join(format!("{sequence:04}_input.raw")),
            encoded: dir.join(format!("{sequence:04}_encoded.mp3")),
            decoded: dir.join(format!("{sequence:04}_decoded.raw")),
        }
    }
}

/// Deletes its file on drop unless told to keep it.
struct ScratchFile<'a> {
    path: &'a Path,
    keep: bool,
}

impl Drop for ScratchFile<'_> {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        if let Err(err) = fs::remove_file(self.path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!("could not remove scratch file {}: {err}", self.path.display());
            }
        }
    }
}

/// Round trip through the `lame` command-line encoder.
pub struct LameRoundTrip {
    executable: PathBuf,
    scratch: ScratchSpace,
    sequence: AtomicUsize,
}

impl LameRoundTrip {
    /// Probes for `lame` on the search path and prepares a scratch space.
    pub fn new(temp_dir: Option<&Path>) -> Result<Self> {
        let executable = locate_codec(LAME_EXECUTABLE)?;
        info!("using codec at {}", executable.display());
        Self::with_executable(executable, temp_dir)
    }

    /// Uses an explicit codec executable instead of probing for one.
    pub fn with_executable(executable: impl Into<PathBuf>, temp_dir: Option<&Path>) -> Result<Self> {
        let scratch = ScratchSpace::new(temp_dir)?;
        debug!("scratch space at {}", scratch.path().display());
        Ok(Self {
            executable: executable.into(),
            scratch,
            sequence: AtomicUsize::new(0),
        })
    }

    pub fn scratch(&self) -> &ScratchSpace {
        &self.scratch
    }

    fn run(&self, stage: &'static str, args: &[&str], input: &Path, output: &Path) -> Result<()> {
        let mut command = Command::new(&self.executable);
        command
            .args(args)
            .arg(input.as_os_str())
            .arg(output.as_os_str());
        debug!("started {} {}", self.executable.display(), render_args(&command));

        let result = command.output()?;
        if !result.status.success() {
            warn!(
                "codec {stage} step failed: {}",
                String::from_utf8_lossy(&result.stderr).trim()
            );
            return Err(GleitzschError::CodecFailed {
                stage,
                status: result.status,
            });
        }
        Ok(())
    }
}

impl LossyRoundTrip for LameRoundTrip {
    fn round_trip(&self, samples: &[u8]) -> Result<Vec<u8>> {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let paths = ScratchPaths::for_sequence(self.scratch.path(), sequence);
        let keep = self.scratch.keeps_files();

        // Guards are created before the files so a failure at any step still
        // removes whatever was already written.
        let _input = ScratchFile { path: &paths.input, keep };
        let _encoded = ScratchFile { path: &paths.encoded, keep };
        let _decoded = ScratchFile { path: &paths.decoded, keep };

        fs::write(&paths.input, samples)?;
        self.run("encode", ENCODE_ARGS, &paths.input, &paths.encoded)?;
        self.run("decode", DECODE_ARGS, &paths.encoded, &paths.decoded)?;

        let decoded = fs::read(&paths.decoded)?;
        info!(
            "orig: {}; decoded size: {}; approx {}x bigger",
            samples.len(),
            decoded.len(),
            decoded.len() / samples.len().max(1)
        );
        recover_samples(&decoded, samples.len())
    }
}

fn render_args(command: &Command) -> String {
    command
        .get_args()
        .map(OsStr::to_string_lossy)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_returns_input() {
        let bytes = vec![0, 1, 127, 128, 255];
        assert_eq!(IdentityRoundTrip.round_trip(&bytes).unwrap(), bytes);
    }

    #[test]
    fn scratch_paths_are_distinct_per_sequence() {
        let dir = Path::new("/scratch");
        let a = ScratchPaths::for_sequence(dir, 0);
        let b = ScratchPaths::for_sequence(dir, 1);
        assert_ne!(a.input, b.input);
        assert_ne!(a.input, a.decoded);
        assert!(a.encoded.to_string_lossy().ends_with(".mp3"));
    }

    #[test]
    fn missing_codec_is_reported() {
        let err = locate_codec("gleitzsch-no-such-codec-binary").unwrap_err();
        assert!(matches!(err, GleitzschError::CodecNotFound(_)));
    }

    #[test]
    fn missing_lookup_program_is_not_reported_as_missing_codec() {
        let err = locate_with("gleitzsch-no-such-which", LAME_EXECUTABLE).unwrap_err();
        match err {
            GleitzschError::LookupUnavailable { lookup, executable, .. } => {
                assert_eq!(lookup, "gleitzsch-no-such-which");
                assert_eq!(executable, LAME_EXECUTABLE);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn ephemeral_scratch_is_removed_on_drop() {
        let scratch = ScratchSpace::new(None).unwrap();
        let path = scratch.path().to_path_buf();
        assert!(path.is_dir());
        assert!(!scratch.keeps_files());
        drop(scratch);
        assert!(!path.exists());
    }

    #[test]
    fn persistent_scratch_is_a_fresh_subdirectory() {
        let root = tempfile::tempdir().unwrap();
        let first = ScratchSpace::new(Some(root.path())).unwrap();
        let second = ScratchSpace::new(Some(root.path())).unwrap();
        assert!(first.keeps_files());
        assert_ne!(first.path(), second.path());
        assert!(first.path().starts_with(root.path()));
        let kept = first.path().to_path_buf();
        drop(first);
        assert!(kept.is_dir());
    }

    #[cfg(unix)]
    mod with_fake_codec {
        use super::super::*;
        use std::os::unix::fs::PermissionsExt;

        // Stands in for lame: encode copies the input, decode writes it twice.
        const DOUBLING_CODEC: &str = r#"#!/bin/sh
eval in=\${$(($# - 1))}
eval out=\${$#}
case " $* " in
    *" --decode "*) cat "$in" "$in" > "$out" ;;
    *) cat "$in" > "$out" ;;
esac
"#;

        const FAILING_CODEC: &str = "#!/bin/sh\nexit 3\n";

        // Encodes fine, then leaves a partial decode behind and fails.
        const DECODE_FAILING_CODEC: &str = r#"#!/bin/sh
eval in=\${$(($# - 1))}
eval out=\${$#}
case " $* " in
    *" --decode "*) head -c 1 "$in" > "$out"; exit 4 ;;
    *) cat "$in" > "$out" ;;
esac
"#;

        fn install(dir: &Path, name: &str, script: &str) -> PathBuf {
            let path = dir.join(name);
            fs::write(&path, script).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        #[test]
        fn recovers_even_bytes_and_cleans_up() {
            let bin = tempfile::tempdir().unwrap();
            let codec = install(bin.path(), "fake-lame", DOUBLING_CODEC);
            let lame = LameRoundTrip::with_executable(codec, None).unwrap();

            let samples: Vec<u8> = (0..16).collect();
            let out = lame.round_trip(&samples).unwrap();

            let doubled: Vec<u8> = samples.iter().chain(samples.iter()).copied().collect();
            let expected: Vec<u8> = doubled.iter().step_by(2).copied().take(samples.len()).collect();
            assert_eq!(out, expected);
            assert_eq!(fs::read_dir(lame.scratch().path()).unwrap().count(), 0);
        }

        #[test]
        fn failing_codec_is_an_error_and_leaves_nothing_behind() {
            let bin = tempfile::tempdir().unwrap();
            let codec = install(bin.path(), "broken-lame", FAILING_CODEC);
            let lame = LameRoundTrip::with_executable(codec, None).unwrap();

            let err = lame.round_trip(&[1, 2, 3, 4]).unwrap_err();
            assert!(matches!(err, GleitzschError::CodecFailed { stage: "encode", .. }));
            assert_eq!(fs::read_dir(lame.scratch().path()).unwrap().count(), 0);
        }

        #[test]
        fn decode_failure_removes_every_intermediate_file() {
            let bin = tempfile::tempdir().unwrap();
            let codec = install(bin.path(), "half-lame", DECODE_FAILING_CODEC);
            let lame = LameRoundTrip::with_executable(codec, None).unwrap();

            let err = lame.round_trip(&[9, 8, 7, 6]).unwrap_err();
            assert!(matches!(err, GleitzschError::CodecFailed { stage: "decode", .. }));
            assert_eq!(fs::read_dir(lame.scratch().path()).unwrap().count(), 0);
        }

        #[test]
        fn persistent_scratch_keeps_intermediate_files() {
            let bin = tempfile::tempdir().unwrap();
            let codec = install(bin.path(), "fake-lame", DOUBLING_CODEC);
            let root = tempfile::tempdir().unwrap();
            let lame = LameRoundTrip::with_executable(codec, Some(root.path())).unwrap();

            lame.round_trip(&[5; 8]).unwrap();

            let paths = ScratchPaths::for_sequence(lame.scratch().path(), 0);
            assert!(paths.input.is_file());
            assert!(paths.encoded.is_file());
            assert_eq!(fs::read(&paths.decoded).unwrap().len(), 16);
        }
    }
}
