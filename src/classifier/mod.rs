//! Executable classification: architecture, graphics API and override module.
//!
//! Classification reads the PE header and import table of the game
//! executable. The graphics API is chosen by the first matching rule in
//! [`API_PRIORITY`]; games commonly import several graphics libraries (a
//! DX11 renderer with a DX9 fallback, say) and the most capable one wins.
//!
//! When the structured parse fails, [`classify`] falls back to reading the
//! raw machine word and, failing that, to a fixed default. Classification
//! never returns an error.
pub mod pe;

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::target::{Architecture, GraphicsApi, OverrideModule};

/// One row of the API detection table.
#[derive(Debug, Clone, Copy)]
pub struct ApiRule {
    /// Lower-case library names; importing any of them selects `api`.
    pub libraries: &'static [&'static str],
    /// API selected by this rule.
    pub api: GraphicsApi,
}

impl ApiRule {
    fn matches(&self, imports: &[String]) -> bool {
        imports
            .iter()
            .any(|name| self.libraries.contains(&name.as_str()))
    }
}

/// API detection rules, highest priority first.
pub const API_PRIORITY: &[ApiRule] = &[
    ApiRule {
        libraries: &["d3d12.dll"],
        api: GraphicsApi::Dx12,
    },
    ApiRule {
        libraries: &["d3d11.dll", "dxgi.dll"],
        api: GraphicsApi::Dx11,
    },
    ApiRule {
        libraries: &["d3d10.dll", "d3d10_1.dll"],
        api: GraphicsApi::Dx10,
    },
    ApiRule {
        libraries: &["d3d9.dll"],
        api: GraphicsApi::Dx9,
    },
    ApiRule {
        libraries: &["opengl32.dll"],
        api: GraphicsApi::OpenGl,
    },
    ApiRule {
        libraries: &["d3d8.dll"],
        api: GraphicsApi::Dx8,
    },
];

/// How a [`Classification`] was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationSource {
    /// Header and import table parsed.
    Imports,
    /// Only the raw machine word could be read.
    RawHeader,
    /// Nothing could be read; unconditional default.
    Fallback,
}

/// Result of classifying an executable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// Target architecture.
    pub architecture: Architecture,
    /// Detected graphics API.
    pub api: GraphicsApi,
    /// Override module for `api`.
    pub module: OverrideModule,
    /// Which path produced this result.
    pub source: ClassificationSource,
}

impl Classification {
    /// 64-bit, DX11, `dxgi`.
    #[must_use]
    pub const fn fallback() -> Self {
        Self {
            architecture: Architecture::X64,
            api: GraphicsApi::Dx11,
            module: OverrideModule::Dxgi,
            source: ClassificationSource::Fallback,
        }
    }

    /// `true` unless the import table was read.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.source != ClassificationSource::Imports
    }
}

/// Pick the graphics API for a set of lower-case import names.
///
/// Defaults to DX11 when no rule matches.
#[must_use]
pub fn detect_api(imports: &[String]) -> GraphicsApi {
    API_PRIORITY
        .iter()
        .find(|rule| rule.matches(imports))
        .map_or(GraphicsApi::Dx11, |rule| rule.api)
}

/// Map a COFF machine type to an architecture; only i386 is 32-bit.
#[must_use]
pub const fn architecture_for_machine(machine: u16) -> Architecture {
    if machine == pe::MACHINE_I386 {
        Architecture::X86
    } else {
        Architecture::X64
    }
}

/// Classify the executable at `path`.
#[must_use]
pub fn classify(path: &Path) -> Classification {
    match classify_from_imports(path) {
        Ok(classification) => classification,
        Err(e) => {
            tracing::debug!("header parse failed for {}: {e}", path.display());
            classify_from_raw_header(path)
        }
    }
}

fn classify_from_imports(path: &Path) -> Result<Classification, pe::PeError> {
    let mut reader = BufReader::new(File::open(path)?);
    let image = pe::parse(&mut reader)?;
    let api = detect_api(&image.imports);
    Ok(Classification {
        architecture: architecture_for_machine(image.machine),
        api,
        module: api.default_module(),
        source: ClassificationSource::Imports,
    })
}

/// Without imports the API is unknown; 32-bit images are assumed to be DX9
/// era, everything else gets the default.
fn classify_from_raw_header(path: &Path) -> Classification {
    let machine = File::open(path).and_then(|mut f| pe::read_raw_machine(&mut f));
    match machine {
        Ok(pe::MACHINE_I386) => Classification {
            architecture: Architecture::X86,
            api: GraphicsApi::Dx9,
            module: OverrideModule::D3d9,
            source: ClassificationSource::RawHeader,
        },
        Ok(_) => Classification {
            source: ClassificationSource::RawHeader,
            ..Classification::fallback()
        },
        Err(_) => Classification::fallback(),
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn imports(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn single_library_maps_to_its_api() {
        let cases = [
            ("d3d12.dll", GraphicsApi::Dx12),
            ("d3d11.dll", GraphicsApi::Dx11),
            ("dxgi.dll", GraphicsApi::Dx11),
            ("d3d10.dll", GraphicsApi::Dx10),
            ("d3d10_1.dll", GraphicsApi::Dx10),
            ("d3d9.dll", GraphicsApi::Dx9),
            ("opengl32.dll", GraphicsApi::OpenGl),
            ("d3d8.dll", GraphicsApi::Dx8),
        ];
        for (lib, api) in cases {
            assert_eq!(detect_api(&imports(&["kernel32.dll", lib])), api, "{lib}");
        }
    }

    #[test]
    fn dx11_beats_dx9() {
        assert_eq!(
            detect_api(&imports(&["d3d9.dll", "d3d11.dll"])),
            GraphicsApi::Dx11
        );
    }

    #[test]
    fn opengl_beats_dx8() {
        assert_eq!(
            detect_api(&imports(&["d3d8.dll", "opengl32.dll"])),
            GraphicsApi::OpenGl
        );
    }

    #[test]
    fn no_graphics_import_defaults_to_dx11() {
        assert_eq!(
            detect_api(&imports(&["kernel32.dll", "user32.dll"])),
            GraphicsApi::Dx11
        );
    }

    #[test]
    fn priority_table_is_strictly_ordered() {
        let apis: Vec<GraphicsApi> = API_PRIORITY.iter().map(|r| r.api).collect();
        assert_eq!(
            apis,
            vec![
                GraphicsApi::Dx12,
                GraphicsApi::Dx11,
                GraphicsApi::Dx10,
                GraphicsApi::Dx9,
                GraphicsApi::OpenGl,
                GraphicsApi::Dx8,
            ]
        );
    }

    #[test]
    fn only_i386_is_32_bit() {
        assert_eq!(architecture_for_machine(0x014C), Architecture::X86);
        assert_eq!(architecture_for_machine(0x8664), Architecture::X64);
        assert_eq!(architecture_for_machine(0xAA64), Architecture::X64);
    }

    #[test]
    fn missing_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let result = classify(&dir.path().join("nope.exe"));
        assert_eq!(result, Classification::fallback());
        assert!(result.is_degraded());
    }

    #[test]
    fn garbage_with_i386_word_is_32_bit_d3d9() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("packed.exe");
        let mut data = vec![0u8; 0x80];
        // Valid offset and machine, but no MZ / PE signatures.
        data[0x3C] = 0x40;
        data[0x44] = 0x4C;
        data[0x45] = 0x01;
        std::fs::write(&exe, data).unwrap();

        let result = classify(&exe);
        assert_eq!(result.architecture, Architecture::X86);
        assert_eq!(result.module, OverrideModule::D3d9);
        assert_eq!(result.source, ClassificationSource::RawHeader);
    }
}
