//! Shared overlay configuration written once into the main path.
use std::path::Path;

use crate::error::ConfigError;

use super::settings::Layout;

/// Render a host path as a Wine `Z:` drive path with doubled separators.
#[must_use]
pub fn wine_path(path: &Path) -> String {
    let mut out = String::from("Z:");
    for component in path.components() {
        if let std::path::Component::Normal(part) = component {
            out.push_str("\\\\");
            out.push_str(&part.to_string_lossy());
        }
    }
    out
}

/// Default configuration pointing the overlay at the merged namespace.
#[must_use]
pub fn default_contents(layout: &Layout) -> String {
    let shaders = wine_path(&layout.merged_shaders());
    let textures = wine_path(&layout.merged_textures());
    format!(
        r"[DEPTH]
DepthCopyAtClearIndex=0
DepthCopyBeforeClears=0
UseAspectRatioHeuristics=1

[GENERAL]
EffectSearchPaths=,{shaders}
IntermediateCachePath=C:\\users\\steamuser\\Temp
PerformanceMode=0
PreprocessorDefinitions=
PresetPath=.\\ReShadePreset.ini
PresetTransitionDelay=1000
SkipLoadingDisabledEffects=0
TextureSearchPaths=,{textures}

[INPUT]
ForceShortcutModifiers=1
InputProcessing=2
KeyEffects=0,0,0,0
KeyNextPreset=0,0,0,0
KeyOverlay=36,0,0,0
KeyPerformanceMode=0,0,0,0
KeyPreviousPreset=0,0,0,0
KeyReload=0,0,0,0
KeyScreenshot=44,0,0,0

[OVERLAY]
ClockFormat=0
FPSPosition=1
NoFontScaling=1
SaveWindowState=0
ShowClock=0
ShowForceLoadEffectsButton=1
ShowFPS=0
ShowFrameTime=0
ShowScreenshotMessage=1
TutorialProgress=4
VariableListHeight=300.000000
VariableListUseTabs=0

[SCREENSHOT]
ClearAlpha=1
FileFormat=1
FileNamingFormat=0
JPEGQuality=90
SaveBeforeShot=0
SaveOverlayShot=0
SavePath=
SavePresetFile=0

[STYLE]
Alpha=1.000000
ChildRounding=0.000000
ColFPSText=1.000000,1.000000,0.784314,1.000000
EditorFont=ProggyClean.ttf
EditorFontSize=13
EditorStyleIndex=0
Font=ProggyClean.ttf
FontSize=13
FPSScale=1.000000
FrameRounding=0.000000
GrabRounding=0.000000
PopupRounding=0.000000
ScrollbarRounding=0.000000
StyleIndex=2
TabRounding=4.000000
WindowRounding=0.000000
"
    )
}

/// Write the default configuration to `<main>/<file_name>` unless a file
/// is already there. Returns whether a file was written.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn ensure(layout: &Layout, file_name: &str) -> Result<bool, ConfigError> {
    let path = layout.main().join(file_name);
    if path.exists() {
        return Ok(false);
    }
    std::fs::write(&path, default_contents(layout)).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(true)
}
