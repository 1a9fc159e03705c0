// Shared helpers for integration tests.
//
// Provides a synthetic PE image builder for classifier tests and a
// temporary main path with the directory layout the installer expects.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(
    dead_code,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::cast_possible_truncation
)]

use std::path::{Path, PathBuf};

use reshade_linux::config::{Layout, TargetStore};
use reshade_linux::install::InstallSources;
use reshade_linux::target::Architecture;

pub const MACHINE_I386: u16 = 0x014C;
pub const MACHINE_AMD64: u16 = 0x8664;

const PE_OFFSET: usize = 0x40;
const SECTION_RVA: u32 = 0x1000;
const SECTION_RAW: usize = 0x200;

fn put_u16(buf: &mut [u8], at: usize, value: u16) {
    buf[at..at + 2].copy_from_slice(&value.to_le_bytes());
}

fn put_u32(buf: &mut [u8], at: usize, value: u32) {
    buf[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

/// Builder for a minimal PE image: DOS header, COFF header, optional
/// header with a data directory, one section holding the import table.
pub struct PeBuilder {
    machine: u16,
    plus: bool,
    imports: Vec<String>,
}

impl PeBuilder {
    /// 32-bit image (PE32, i386).
    pub fn pe32() -> Self {
        Self {
            machine: MACHINE_I386,
            plus: false,
            imports: Vec::new(),
        }
    }

    /// 64-bit image (PE32+, AMD64).
    pub fn pe64() -> Self {
        Self {
            machine: MACHINE_AMD64,
            plus: true,
            imports: Vec::new(),
        }
    }

    /// Add an imported library.
    pub fn import(mut self, name: &str) -> Self {
        self.imports.push(name.to_string());
        self
    }

    /// Serialise the image.
    pub fn build(&self) -> Vec<u8> {
        let directories = if self.plus { 112 } else { 96 };
        let optional_size = directories + 16 * 8;
        let optional_start = PE_OFFSET + 24;
        let section_table = optional_start + optional_size;

        let descriptors = (self.imports.len() + 1) * 20;
        let names_start = descriptors;
        let names_len: usize = self.imports.iter().map(|n| n.len() + 1).sum();
        let section_len = names_start + names_len;
        let mut buf = vec![0u8; SECTION_RAW + section_len];

        // DOS header
        buf[0] = b'M';
        buf[1] = b'Z';
        put_u32(&mut buf, 0x3C, PE_OFFSET as u32);

        // PE signature + COFF header
        buf[PE_OFFSET..PE_OFFSET + 4].copy_from_slice(b"PE\0\0");
        put_u16(&mut buf, PE_OFFSET + 4, self.machine);
        put_u16(&mut buf, PE_OFFSET + 6, 1);
        put_u16(&mut buf, PE_OFFSET + 20, optional_size as u16);

        // Optional header
        put_u16(&mut buf, optional_start, if self.plus { 0x20B } else { 0x10B });
        put_u32(&mut buf, optional_start + directories - 4, 16);
        if !self.imports.is_empty() {
            put_u32(&mut buf, optional_start + directories + 8, SECTION_RVA);
            put_u32(&mut buf, optional_start + directories + 12, descriptors as u32);
        }

        // Section header
        buf[section_table..section_table + 5].copy_from_slice(b".idat");
        put_u32(&mut buf, section_table + 8, section_len as u32);
        put_u32(&mut buf, section_table + 12, SECTION_RVA);
        put_u32(&mut buf, section_table + 16, section_len as u32);
        put_u32(&mut buf, section_table + 20, SECTION_RAW as u32);

        // Import descriptors and names
        let mut name_offset = names_start;
        for (index, name) in self.imports.iter().enumerate() {
            let descriptor = SECTION_RAW + index * 20;
            put_u32(&mut buf, descriptor + 12, SECTION_RVA + name_offset as u32);
            put_u32(&mut buf, descriptor + 16, SECTION_RVA);
            let at = SECTION_RAW + name_offset;
            buf[at..at + name.len()].copy_from_slice(name.as_bytes());
            name_offset += name.len() + 1;
        }

        buf
    }

    /// Write the image to `path`, creating parent directories.
    pub fn write_to(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create exe parent");
        }
        std::fs::write(path, self.build()).expect("write exe");
    }
}

/// A main path in a temporary directory with the layout created.
pub struct MainPath {
    pub dir: tempfile::TempDir,
    pub layout: Layout,
}

impl MainPath {
    /// Empty layout, no overlay downloaded.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let layout = Layout::new(dir.path().join("reshade-main"));
        layout.ensure_dirs().expect("create layout");
        Self { dir, layout }
    }

    /// Place both overlay libraries for `version` and record it in `LVERS`.
    pub fn with_overlay(self, version: &str) -> Self {
        for arch in [Architecture::X86, Architecture::X64] {
            let path = self.layout.overlay_binary(version, arch);
            std::fs::create_dir_all(path.parent().expect("version dir")).expect("create version dir");
            std::fs::write(&path, format!("ReShade {version} {arch}")).expect("write overlay");
        }
        std::fs::write(self.layout.lvers_path(), version).expect("write LVERS");
        self
    }

    /// Place the compiler library for `arch`.
    pub fn with_compiler(self, arch: Architecture) -> Self {
        std::fs::write(self.layout.compiler_path(arch), "d3dcompiler").expect("write compiler");
        self
    }

    /// Write the shared config file.
    pub fn with_config(self, name: &str) -> Self {
        std::fs::write(self.layout.main().join(name), "[GENERAL]\n").expect("write config");
        self
    }

    /// Write `relative` (e.g. `Shaders/Bloom.fx`) under shader repository `repo`.
    pub fn with_shader_file(self, repo: &str, relative: &str, content: &str) -> Self {
        let path = self.layout.shaders_dir().join(repo).join(relative);
        std::fs::create_dir_all(path.parent().expect("parent")).expect("create shader dir");
        std::fs::write(path, content).expect("write shader");
        self
    }

    /// Install sources for the recorded overlay version.
    pub fn sources(&self, config_name: &str) -> InstallSources {
        InstallSources::new(
            &self.layout,
            &self.layout.resolve_version("latest"),
            config_name,
        )
    }

    /// Open the target store.
    pub fn store(&self) -> TargetStore {
        TargetStore::open(&self.layout.store_path())
    }

    /// Create an empty game directory named `name` beside the main path.
    pub fn game_dir(&self, name: &str) -> PathBuf {
        let path = self.dir.path().join("games").join(name);
        std::fs::create_dir_all(&path).expect("create game dir");
        path
    }
}
