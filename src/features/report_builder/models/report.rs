use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

use crate::core::error::AppError;
use crate::features::presets::models::{NewPreset, Preset, PresetKind};
use crate::shared::constants::DEFAULT_REPORT_TITLE;
use crate::shared::validation::PHONE_REGEX;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("A report needs at least one technical item")]
    LastItem,

    #[error("Technical item {0} not found")]
    ItemNotFound(Uuid),
}

impl From<FormError> for AppError {
    fn from(err: FormError) -> Self {
        match err {
            FormError::LastItem => AppError::BadRequest(err.to_string()),
            FormError::ItemNotFound(_) => AppError::NotFound(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Validate)]
pub struct TechnicalItem {
    pub id: Uuid,
    #[validate(length(min = 1, message = "Item description is required"))]
    pub description: String,
}

impl TechnicalItem {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: description.into(),
        }
    }
}

/// Field values of a technical service report.
///
/// Photo links are not stored here; they live on the photos themselves.
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct ReportData {
    #[validate(length(min = 1, max = 255, message = "Report title is required (max 255 characters)"))]
    pub report_title: String,
    /// Issuing company; the default company when unset
    pub company_id: Option<Uuid>,

    #[validate(length(min = 1, max = 255, message = "Contract is required (max 255 characters)"))]
    pub contract: String,
    #[validate(length(min = 1, max = 100, message = "Initial value is required (max 100 characters)"))]
    pub initial_value: String,
    #[validate(length(min = 1, max = 100, message = "RQ is required (max 100 characters)"))]
    pub requisition: String,
    #[validate(length(min = 1, max = 100, message = "OS is required (max 100 characters)"))]
    pub service_order: String,
    #[validate(length(min = 1, max = 100, message = "Purchase order is required (max 100 characters)"))]
    pub purchase_order: String,

    #[validate(length(min = 1, message = "Scope description is required"))]
    pub scope_description: String,

    #[validate(nested)]
    pub items: Vec<TechnicalItem>,

    #[validate(length(min = 1, message = "Author name is required"))]
    pub author_name: String,
    #[validate(length(min = 1, message = "Primary role is required"))]
    pub author_primary_role: String,
    #[validate(length(min = 1, message = "Secondary role is required"))]
    pub author_secondary_role: String,
    #[validate(length(min = 1, message = "Preparation date is required"))]
    pub prepared_on: String,

    #[validate(
        length(min = 1, message = "Phone is required"),
        regex(path = *PHONE_REGEX, message = "Phone may only contain digits, spaces, parentheses, + and -")
    )]
    pub phone: String,
    #[validate(email(message = "Email must be valid"))]
    pub email: String,
    #[validate(length(min = 1, message = "Instagram is required"))]
    pub instagram: String,

    pub background_image_url: Option<String>,
}

impl ReportData {
    /// Blank report with one empty item, dated `prepared_on` (dd/mm/yyyy)
    pub fn blank(prepared_on: impl Into<String>) -> Self {
        Self {
            report_title: DEFAULT_REPORT_TITLE.to_string(),
            company_id: None,
            contract: String::new(),
            initial_value: String::new(),
            requisition: String::new(),
            service_order: String::new(),
            purchase_order: String::new(),
            scope_description: String::new(),
            items: vec![TechnicalItem::new("")],
            author_name: String::new(),
            author_primary_role: String::new(),
            author_secondary_role: String::new(),
            prepared_on: prepared_on.into(),
            phone: String::new(),
            email: String::new(),
            instagram: String::new(),
            background_image_url: None,
        }
    }
}

/// Partial field update; `None` leaves a field untouched.
/// An empty `background_image_url` removes the background.
#[derive(Debug, Clone, Default)]
pub struct ReportFieldsPatch {
    pub report_title: Option<String>,
    pub company_id: Option<Uuid>,
    pub contract: Option<String>,
    pub initial_value: Option<String>,
    pub requisition: Option<String>,
    pub service_order: Option<String>,
    pub purchase_order: Option<String>,
    pub scope_description: Option<String>,
    pub author_name: Option<String>,
    pub author_primary_role: Option<String>,
    pub author_secondary_role: Option<String>,
    pub prepared_on: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub instagram: Option<String>,
    pub background_image_url: Option<String>,
}

/// Report field values plus the technical item list.
///
/// The item list never drops below one entry.
#[derive(Debug, Clone)]
pub struct ReportForm {
    data: ReportData,
}

impl ReportForm {
    pub fn new(prepared_on: impl Into<String>) -> Self {
        Self {
            data: ReportData::blank(prepared_on),
        }
    }

    pub fn data(&self) -> &ReportData {
        &self.data
    }

    pub fn has_item(&self, id: Uuid) -> bool {
        self.data.items.iter().any(|item| item.id == id)
    }

    pub fn update_fields(&mut self, patch: ReportFieldsPatch) {
        let data = &mut self.data;
        let ReportFieldsPatch {
            report_title,
            company_id,
            contract,
            initial_value,
            requisition,
            service_order,
            purchase_order,
            scope_description,
            author_name,
            author_primary_role,
            author_secondary_role,
            prepared_on,
            phone,
            email,
            instagram,
            background_image_url,
        } = patch;

        fn set(target: &mut String, value: Option<String>) {
            if let Some(value) = value {
                *target = value;
            }
        }

        set(&mut data.report_title, report_title);
        set(&mut data.contract, contract);
        set(&mut data.initial_value, initial_value);
        set(&mut data.requisition, requisition);
        set(&mut data.service_order, service_order);
        set(&mut data.purchase_order, purchase_order);
        set(&mut data.scope_description, scope_description);
        set(&mut data.author_name, author_name);
        set(&mut data.author_primary_role, author_primary_role);
        set(&mut data.author_secondary_role, author_secondary_role);
        set(&mut data.prepared_on, prepared_on);
        set(&mut data.phone, phone);
        set(&mut data.email, email);
        set(&mut data.instagram, instagram);

        if company_id.is_some() {
            data.company_id = company_id;
        }
        if let Some(url) = background_image_url {
            data.background_image_url = Some(url).filter(|u| !u.trim().is_empty());
        }
    }

    pub fn add_item(&mut self, description: impl Into<String>) -> TechnicalItem {
        let item = TechnicalItem::new(description);
        self.data.items.push(item.clone());
        item
    }

    pub fn update_item(&mut self, id: Uuid, description: impl Into<String>) -> Result<(), FormError> {
        let item = self
            .data
            .items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or(FormError::ItemNotFound(id))?;
        item.description = description.into();
        Ok(())
    }

    /// Remove an item. Callers must also drop photo links to it.
    pub fn remove_item(&mut self, id: Uuid) -> Result<(), FormError> {
        let index = self
            .data
            .items
            .iter()
            .position(|item| item.id == id)
            .ok_or(FormError::ItemNotFound(id))?;

        if self.data.items.len() == 1 {
            return Err(FormError::LastItem);
        }

        self.data.items.remove(index);
        Ok(())
    }

    /// Overwrite contract fields, scope, background and items from a preset.
    /// Callers must also clear photo links, since every item id changes.
    pub fn apply_preset(&mut self, preset: &Preset) {
        let data = &mut self.data;
        data.contract = preset.contract.clone();
        data.initial_value = preset.initial_value.clone();
        data.requisition = preset.requisition.clone();
        data.service_order = preset.service_order.clone();
        data.purchase_order = preset.purchase_order.clone();
        data.scope_description = preset.scope_description.clone();
        data.background_image_url = preset.background_image_url.clone();

        if preset.kind == PresetKind::Report && preset.company_id.is_some() {
            data.company_id = preset.company_id;
        }

        data.items = preset
            .items
            .iter()
            .map(|description| TechnicalItem::new(description.as_str()))
            .collect();
        if data.items.is_empty() {
            data.items.push(TechnicalItem::new(""));
        }
    }

    /// Snapshot of the form as a preset of the given kind
    pub fn to_new_preset(&self, kind: PresetKind, name: impl Into<String>) -> NewPreset {
        let data = &self.data;
        NewPreset {
            name: name.into(),
            contract: data.contract.clone(),
            initial_value: data.initial_value.clone(),
            requisition: data.requisition.clone(),
            service_order: data.service_order.clone(),
            purchase_order: data.purchase_order.clone(),
            scope_description: data.scope_description.clone(),
            background_image_url: data.background_image_url.clone(),
            company_id: match kind {
                PresetKind::Report => data.company_id,
                PresetKind::Contract => None,
            },
            items: data
                .items
                .iter()
                .map(|item| item.description.clone())
                .collect(),
        }
    }

    pub fn validate(&self) -> Result<(), validator::ValidationErrors> {
        self.data.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fake::faker::internet::en::SafeEmail;
    use fake::faker::lorem::en::Sentence;
    use fake::faker::name::en::Name;
    use fake::Fake;

    fn preset(items: Vec<&str>) -> Preset {
        let now = Utc::now();
        Preset {
            id: Uuid::new_v4(),
            kind: PresetKind::Report,
            name: "Modelo".to_string(),
            contract: "ATLAS BH".to_string(),
            initial_value: "R$ 850,00".to_string(),
            requisition: "RQ13853907".to_string(),
            service_order: "50007".to_string(),
            purchase_order: "OC10845507".to_string(),
            scope_description: "Instalação de tomadas".to_string(),
            background_image_url: Some("/relatorio-tecnico/fundo-pdf.jpg".to_string()),
            company_id: Some(Uuid::new_v4()),
            items: items.into_iter().map(String::from).collect(),
            usage_count: 0,
            last_used_at: now,
            created_at: now,
            updated_at: now,
        }
    }

    fn filled_form() -> ReportForm {
        let mut form = ReportForm::new("01/02/2025");
        form.apply_preset(&preset(vec!["Item A", "Item B"]));
        form.update_fields(ReportFieldsPatch {
            author_name: Some(Name().fake()),
            author_primary_role: Some("Eletricista".to_string()),
            author_secondary_role: Some("Supervisor".to_string()),
            phone: Some("(31) 99999-0000".to_string()),
            email: Some(SafeEmail().fake()),
            instagram: Some("@gm".to_string()),
            ..Default::default()
        });
        form
    }

    #[test]
    fn test_new_form_has_one_blank_item() {
        let form = ReportForm::new("01/02/2025");
        assert_eq!(form.data().items.len(), 1);
        assert_eq!(form.data().items[0].description, "");
        assert_eq!(form.data().report_title, DEFAULT_REPORT_TITLE);
        assert_eq!(form.data().prepared_on, "01/02/2025");
    }

    #[test]
    fn test_remove_last_item_is_rejected() {
        let mut form = ReportForm::new("01/02/2025");
        let only = form.data().items[0].id;
        assert_eq!(form.remove_item(only), Err(FormError::LastItem));

        let added = form.add_item("Segundo");
        form.remove_item(only).unwrap();
        assert_eq!(form.data().items, vec![added.clone()]);
        assert_eq!(form.remove_item(added.id), Err(FormError::LastItem));
    }

    #[test]
    fn test_update_unknown_item() {
        let mut form = ReportForm::new("01/02/2025");
        let missing = Uuid::new_v4();
        assert_eq!(
            form.update_item(missing, "x"),
            Err(FormError::ItemNotFound(missing))
        );
    }

    #[test]
    fn test_patch_only_touches_given_fields() {
        let mut form = ReportForm::new("01/02/2025");
        let description: String = Sentence(3..6).fake();
        form.update_fields(ReportFieldsPatch {
            scope_description: Some(description.clone()),
            background_image_url: Some("/fundo.png".to_string()),
            ..Default::default()
        });
        assert_eq!(form.data().scope_description, description);
        assert_eq!(form.data().report_title, DEFAULT_REPORT_TITLE);

        form.update_fields(ReportFieldsPatch {
            background_image_url: Some(String::new()),
            ..Default::default()
        });
        assert_eq!(form.data().background_image_url, None);
    }

    #[test]
    fn test_apply_preset_replaces_items_with_fresh_ids() {
        let mut form = ReportForm::new("01/02/2025");
        let old_id = form.data().items[0].id;
        let preset = preset(vec!["Item A", "Item B", "Item C"]);

        form.apply_preset(&preset);

        let data = form.data();
        assert_eq!(data.items.len(), 3);
        assert!(data.items.iter().all(|item| item.id != old_id));
        assert_eq!(data.items[1].description, "Item B");
        assert_eq!(data.contract, "ATLAS BH");
        assert_eq!(data.company_id, preset.company_id);
    }

    #[test]
    fn test_apply_empty_preset_keeps_blank_item() {
        let mut form = ReportForm::new("01/02/2025");
        form.apply_preset(&preset(vec![]));
        assert_eq!(form.data().items.len(), 1);
        assert_eq!(form.data().items[0].description, "");
    }

    #[test]
    fn test_validate() {
        assert!(ReportForm::new("01/02/2025").validate().is_err());

        let mut form = filled_form();
        assert!(form.validate().is_ok());

        form.update_fields(ReportFieldsPatch {
            email: Some("sem-arroba".to_string()),
            ..Default::default()
        });
        let errors = form.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("email"));
    }

    #[test]
    fn test_validate_rejects_values_longer_than_their_columns() {
        let mut form = filled_form();
        form.update_fields(ReportFieldsPatch {
            requisition: Some("R".repeat(101)),
            ..Default::default()
        });
        let errors = form.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("requisition"));

        let mut form = filled_form();
        form.update_fields(ReportFieldsPatch {
            contract: Some("C".repeat(256)),
            phone: Some("ligar depois".to_string()),
            ..Default::default()
        });
        let errors = form.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("contract"));
        assert!(fields.contains_key("phone"));
    }

    #[test]
    fn test_to_new_preset() {
        let form = filled_form();
        let contract = form.to_new_preset(PresetKind::Contract, "Salvo");
        assert_eq!(contract.name, "Salvo");
        assert_eq!(contract.items, vec!["Item A", "Item B"]);
        assert_eq!(contract.company_id, None);

        let report = form.to_new_preset(PresetKind::Report, "Salvo");
        assert_eq!(report.company_id, form.data().company_id);
    }
}
