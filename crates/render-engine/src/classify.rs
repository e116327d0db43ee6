//! Fatal signature table for renderer output.
//!
//! Each renderer line is checked against a fixed, ordered list of literal
//! substrings. The first match wins. Adding a signature means adding a row
//! to [`SIGNATURES`] and bumping [`SIGNATURE_TABLE_VERSION`].

use std::fmt;

/// Revision of [`SIGNATURES`].
pub const SIGNATURE_TABLE_VERSION: u32 = 2;

/// Unrecoverable conditions recognised in renderer output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderErrorKind {
    NoMemory,
    NoVideoMemory,
    FilesystemError,
    PythonFail,
    RendererNotSupported,
    GpuNotSupported,
    RendererKernelFail,
    RendererCrash,
    ExceptionAccessViolation,
}

/// Literal signature → kind, checked top to bottom.
///
/// More specific CUDA messages sit above the generic `CUDA error`.
pub const SIGNATURES: &[(&str, RenderErrorKind)] = &[
    ("std::bad_alloc", RenderErrorKind::NoMemory),
    ("alloc returns null", RenderErrorKind::NoMemory),
    ("System is out of GPU memory", RenderErrorKind::NoVideoMemory),
    ("CUDA error: Out of memory", RenderErrorKind::NoVideoMemory),
    (
        "CUDA kernel compilation failed",
        RenderErrorKind::RendererKernelFail,
    ),
    (
        "CUDA device supported only with compute capability",
        RenderErrorKind::GpuNotSupported,
    ),
    ("CUDA error", RenderErrorKind::RendererCrash),
    (
        "terminate called after throwing an instance of 'boost::filesystem::filesystem_error'",
        RenderErrorKind::FilesystemError,
    ),
    (
        "Fatal Python error: Py_Initialize",
        RenderErrorKind::PythonFail,
    ),
    (
        "Warning: Cycles is not enabled!",
        RenderErrorKind::RendererNotSupported,
    ),
    (
        "not available for scene",
        RenderErrorKind::RendererNotSupported,
    ),
    (
        "EXCEPTION_ACCESS_VIOLATION",
        RenderErrorKind::ExceptionAccessViolation,
    ),
];

/// Classify one line of renderer output.
pub fn classify(line: &str) -> Option<RenderErrorKind> {
    SIGNATURES
        .iter()
        .find(|(signature, _)| line.contains(signature))
        .map(|(_, kind)| *kind)
}

impl RenderErrorKind {
    /// Stable upper-case code for logs and reports.
    pub fn code(self) -> &'static str {
        match self {
            RenderErrorKind::NoMemory => "NO_MEMORY",
            RenderErrorKind::NoVideoMemory => "NO_VIDEO_MEMORY",
            RenderErrorKind::FilesystemError => "FILESYSTEM_ERROR",
            RenderErrorKind::PythonFail => "PYTHON_FAIL",
            RenderErrorKind::RendererNotSupported => "RENDERER_NOT_SUPPORTED",
            RenderErrorKind::GpuNotSupported => "GPU_NOT_SUPPORTED",
            RenderErrorKind::RendererKernelFail => "RENDERER_KERNEL_FAIL",
            RenderErrorKind::RendererCrash => "RENDERER_CRASH",
            RenderErrorKind::ExceptionAccessViolation => "EXCEPTION_ACCESS_VIOLATION",
        }
    }
}

impl fmt::Display for RenderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            RenderErrorKind::NoMemory => "ran out of system memory",
            RenderErrorKind::NoVideoMemory => "ran out of GPU memory",
            RenderErrorKind::FilesystemError => "could not read data from the filesystem",
            RenderErrorKind::PythonFail => "embedded Python failed to start",
            RenderErrorKind::RendererNotSupported => "render engine not available in this build",
            RenderErrorKind::GpuNotSupported => "graphics card not supported",
            RenderErrorKind::RendererKernelFail => "GPU kernel failed to compile",
            RenderErrorKind::RendererCrash => "renderer crashed",
            // Non-specific; the raw name is what operators will search for.
            RenderErrorKind::ExceptionAccessViolation => "EXCEPTION_ACCESS_VIOLATION",
        };
        f.write_str(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_signature_maps_to_its_kind() {
        for (signature, kind) in SIGNATURES {
            let line = format!("Error: {signature} (at frame 12)");
            assert_eq!(classify(&line), Some(*kind), "signature {signature:?}");
        }
    }

    #[test]
    fn test_specific_cuda_messages_beat_generic() {
        assert_eq!(
            classify("CUDA error: Out of memory in cuMemAlloc_v2"),
            Some(RenderErrorKind::NoVideoMemory)
        );
        assert_eq!(
            classify("CUDA error at cuCtxCreate: Invalid device"),
            Some(RenderErrorKind::RendererCrash)
        );
    }

    #[test]
    fn test_progress_lines_are_not_fatal() {
        for line in [
            "Fra:1 Mem:120.44M (Peak 130.01M) | Time:00:01.52 | Syncing Cube",
            "Fra:12 Mem:98.00M (Peak 130.01M) | Time:00:04.10 | Compositing | Tile 1-1",
            "Saved: '/renders/shot_0012.png'",
            "Blender quit",
            "",
        ] {
            assert_eq!(classify(line), None, "line {line:?}");
        }
    }

    #[test]
    fn test_codes_are_distinct() {
        let mut codes: Vec<_> = SIGNATURES.iter().map(|(_, k)| k.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), 9);
    }
}
