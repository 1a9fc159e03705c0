//! Target model: a game installation the overlay can be linked into.
pub mod discover;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;

use crate::classifier::Classification;

/// Processor architecture of a target executable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Architecture {
    /// 32-bit x86.
    X86,
    /// Anything else; treated as 64-bit.
    #[default]
    X64,
}

impl Architecture {
    /// Pointer width in bits (`32` or `64`), as used in overlay file names.
    #[must_use]
    pub const fn bits(self) -> u32 {
        match self {
            Self::X86 => 32,
            Self::X64 => 64,
        }
    }

    /// Parse a pointer width; only `32` and `64` are recognised.
    #[must_use]
    pub const fn from_bits(bits: u64) -> Option<Self> {
        match bits {
            32 => Some(Self::X86),
            64 => Some(Self::X64),
            _ => None,
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-bit", self.bits())
    }
}

impl Serialize for Architecture {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.bits())
    }
}

/// Graphics API a target renders with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphicsApi {
    /// Direct3D 8.
    Dx8,
    /// Direct3D 9.
    Dx9,
    /// Direct3D 10.
    Dx10,
    /// Direct3D 11.
    #[default]
    Dx11,
    /// Direct3D 12.
    Dx12,
    /// OpenGL.
    #[serde(rename = "opengl")]
    OpenGl,
}

impl GraphicsApi {
    /// Stable lower-case identifier used in the target store.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dx8 => "dx8",
            Self::Dx9 => "dx9",
            Self::Dx10 => "dx10",
            Self::Dx11 => "dx11",
            Self::Dx12 => "dx12",
            Self::OpenGl => "opengl",
        }
    }

    /// The override module this API is installed under unless overridden.
    #[must_use]
    pub const fn default_module(self) -> OverrideModule {
        match self {
            Self::Dx12 | Self::Dx11 => OverrideModule::Dxgi,
            Self::Dx10 => OverrideModule::D3d10,
            Self::Dx9 => OverrideModule::D3d9,
            Self::OpenGl => OverrideModule::Opengl32,
            Self::Dx8 => OverrideModule::D3d8,
        }
    }
}

impl fmt::Display for GraphicsApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_uppercase())
    }
}

impl FromStr for GraphicsApi {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dx8" => Ok(Self::Dx8),
            "dx9" => Ok(Self::Dx9),
            "dx10" => Ok(Self::Dx10),
            "dx11" => Ok(Self::Dx11),
            "dx12" => Ok(Self::Dx12),
            "opengl" => Ok(Self::OpenGl),
            other => Err(format!("unknown graphics API: {other}")),
        }
    }
}

/// Library name the overlay impersonates inside the game directory.
///
/// Exactly one is linked per target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverrideModule {
    /// `dxgi.dll` (Direct3D 10/11/12).
    Dxgi,
    /// `d3d9.dll`.
    D3d9,
    /// `d3d11.dll`, an alternative for Direct3D 11.
    D3d11,
    /// `d3d10.dll`.
    D3d10,
    /// `opengl32.dll`.
    Opengl32,
    /// `d3d8.dll`.
    D3d8,
    /// `ddraw.dll` (DirectDraw).
    Ddraw,
    /// `dinput8.dll` (DirectInput 8).
    Dinput8,
}

impl OverrideModule {
    /// Every module, in menu order.
    pub const ALL: [Self; 8] = [
        Self::Dxgi,
        Self::D3d9,
        Self::D3d11,
        Self::D3d10,
        Self::Opengl32,
        Self::D3d8,
        Self::Ddraw,
        Self::Dinput8,
    ];

    /// Module name without extension.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dxgi => "dxgi",
            Self::D3d9 => "d3d9",
            Self::D3d11 => "d3d11",
            Self::D3d10 => "d3d10",
            Self::Opengl32 => "opengl32",
            Self::D3d8 => "d3d8",
            Self::Ddraw => "ddraw",
            Self::Dinput8 => "dinput8",
        }
    }

    /// File name of the shim inside the install directory.
    #[must_use]
    pub fn file_name(self) -> String {
        format!("{}.dll", self.as_str())
    }

    /// Short description of what the module hooks.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Dxgi => "DirectX 10/11/12",
            Self::D3d9 => "DirectX 9",
            Self::D3d11 => "DirectX 11 alternative",
            Self::D3d10 => "DirectX 10",
            Self::Opengl32 => "OpenGL",
            Self::D3d8 => "DirectX 8",
            Self::Ddraw => "DirectDraw",
            Self::Dinput8 => "DirectInput 8",
        }
    }
}

impl fmt::Display for OverrideModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OverrideModule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.to_ascii_lowercase();
        let name = name.strip_suffix(".dll").unwrap_or(&name);
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == name)
            .ok_or_else(|| format!("unknown override module: {s}"))
    }
}

/// A game the overlay can be installed into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetRecord {
    /// Display name.
    pub name: String,
    /// Directory the target was discovered at; the store key is derived from it.
    pub path: PathBuf,
    /// Candidate executables under `path`. Not persisted.
    pub exe_files: Vec<PathBuf>,
    /// Architecture of the selected executable.
    pub architecture: Architecture,
    /// Detected (or assumed) graphics API.
    pub detected_api: GraphicsApi,
    /// Module the overlay is linked as.
    pub dll_override: OverrideModule,
    /// Directory the link set is created in.
    pub install_path: PathBuf,
    /// Executable that was classified, if any.
    pub selected_exe: Option<PathBuf>,
}

impl TargetRecord {
    /// Create a manually-entered record with default classification
    /// (64-bit, DX11, `dxgi`) installing into `path`.
    #[must_use]
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            name: name.into(),
            install_path: path.clone(),
            path,
            exe_files: Vec::new(),
            architecture: Architecture::default(),
            detected_api: GraphicsApi::default(),
            dll_override: GraphicsApi::default().default_module(),
            selected_exe: None,
        }
    }

    /// Create a record named after the final component of `path`.
    #[must_use]
    pub fn for_directory(path: &Path) -> Self {
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        Self::new(name, path)
    }

    /// Adopt the classification of `exe`: the install directory moves to the
    /// executable's parent and the override module follows the detected API.
    pub fn apply_classification(&mut self, exe: &Path, classification: &Classification) {
        self.architecture = classification.architecture;
        self.detected_api = classification.api;
        self.dll_override = classification.module;
        if let Some(parent) = exe.parent() {
            self.install_path = parent.to_path_buf();
        }
        self.selected_exe = Some(exe.to_path_buf());
    }

    /// Explicitly pick the override module, independent of the detected API.
    pub const fn override_module(&mut self, module: OverrideModule) {
        self.dll_override = module;
    }
}

impl fmt::Display for TargetRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {})",
            self.name, self.detected_api, self.architecture
        )
    }
}
