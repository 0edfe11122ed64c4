use super::preset::NewPreset;
use crate::shared::constants::DEFAULT_BACKGROUND_IMAGE;

/// The three presets seeded into an empty store.
///
/// Contract and report stores receive the same set; report presets are
/// attached to the default company by the caller.
pub fn default_presets() -> Vec<NewPreset> {
    vec![
        NewPreset {
            name: "ATLAS BH - Instalação Tomadas".to_string(),
            contract: "ATLAS BH".to_string(),
            initial_value: "R$ 850,00".to_string(),
            requisition: "RQ13853907".to_string(),
            service_order: "50007".to_string(),
            purchase_order: "OC10845507".to_string(),
            scope_description: "Instalação de tomadas e pontos elétricos".to_string(),
            background_image_url: Some(DEFAULT_BACKGROUND_IMAGE.to_string()),
            company_id: None,
            items: to_items(&[
                "Módulo acrescentado TV",
                "Ponto tomada condulete para cafeteira",
                "Instalação de tomada dupla no escritório",
                "Verificação de aterramento",
                "Teste de funcionamento das tomadas",
]),
        },
        NewPreset {
            name: "ATLAS BH - Manutenção Elétrica".to_string(),
            contract: "ATLAS BH".to_string(),
            initial_value: "R$ 1.200,00".to_string(),
            requisition: "RQ13853908".to_string(),
            service_order: "50008".to_string(),
            purchase_order: "OC10845508".to_string(),
            scope_description: "Manutenção preventiva e corretiva do sistema elétrico".to_string(),
            background_image_url: Some(DEFAULT_BACKGROUND_IMAGE.to_string()),
            company_id: None,
            items: to_items(&[
                "Substituição de disjuntores defeituosos",
                "Verificação e ajuste de tensão nos quadros",
                "Instalação de iluminação de emergência",
                "Teste de funcionamento dos dispositivos de proteção",
                "Inspeção visual dos cabos e conexões",
                "Medição de resistência de aterramento",
                "Verificação de continuidade dos circuitos",
]),
        },
        NewPreset {
            name: "Empresa ABC - Projeto Completo".to_string(),
            contract: "ABC CONSTRUÇÕES".to_string(),
            initial_value: "R$ 2.500,00".to_string(),
            requisition: "RQ12345678".to_string(),
            service_order: "12345".to_string(),
            purchase_order: "OC98765432".to_string(),
            scope_description: "Projeto elétrico completo para nova construção".to_string(),
            background_image_url: Some(DEFAULT_BACKGROUND_IMAGE.to_string()),
            company_id: None,
            items: to_items(&[
                "Instalação do quadro de distribuição principal",
                "Cabeamento estruturado para rede de dados",
                "Sistema de iluminação LED com dimmer",
                "Instalação de ar condicionado central",
                "Sistema de segurança e monitoramento",
                "Automação residencial básica",
                "Instalação de sistema de alarme",
                "Configuração de rede Wi-Fi",
                "Instalação de sistema de som ambiente",
                "Teste e comissionamento de todos os sistemas",
]),
        },
    ]
}

fn to_items(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_presets() {
        let presets = default_presets();
        assert_eq!(presets.len(), 3);
        assert_eq!(
            presets.iter().map(|p| p.items.len()).collect::<Vec<_>>(),
            vec![5, 7, 10]
        );
        assert!(presets.iter().all(|p| p.company_id.is_none()));
    }
}
