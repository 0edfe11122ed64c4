pub mod preset_dto;

pub use preset_dto::{
    CreatePresetDto, InitializePresetsDto, PresetFilter, PresetItemDto, PresetItemInput,
    PresetQueryParams, PresetResponseDto, UpdatePresetDto,
};
