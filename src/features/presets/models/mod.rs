pub mod defaults;
pub mod preset;

pub use defaults::default_presets;
pub use preset::{
    NewPreset, Preset, PresetChanges, PresetItemRow, PresetKind, PresetListQuery, PresetOrder,
    PresetRow,
};
