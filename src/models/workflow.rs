use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Storage identifier of the validation screen.
pub const VALIDATION_SCREEN_ID: &str = "cadastro/ligacaoEsgotoLote:validacao";

/// Storage identifier of the monitoring screen.
pub const MONITORING_SCREEN_ID: &str = "cadastro/ligacaoEsgotoLote:monitoramento";

/// A table whose pagination state is persisted between visits.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct TableId {
    pub screen: &'static str,
    pub suffix: &'static str,
}

impl TableId {
    pub const CRITIQUES: TableId = TableId {
        screen: VALIDATION_SCREEN_ID,
        suffix: "TABELA",
    };
    pub const MONITORING: TableId = TableId {
        screen: MONITORING_SCREEN_ID,
        suffix: "TABELA1",
    };
    pub const RESULTS: TableId = TableId {
        screen: MONITORING_SCREEN_ID,
        suffix: "TABELA2",
    };

    /// Store key for one user's copy of this table.
    pub fn store_key(&self, user: &str) -> String {
        format!("{}:{}_{}", user, self.screen, self.suffix)
    }
}

/// Steps of the batch import wizard.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum WorkflowStep {
    Import,
    Validate,
    Monitor,
}

impl WorkflowStep {
    /// Tables rendered by this step, reloaded whenever the step is entered.
    pub fn tables(&self) -> &'static [TableId] {
        match self {
            WorkflowStep::Import => &[],
            WorkflowStep::Validate => &[TableId::CRITIQUES],
            WorkflowStep::Monitor => &[TableId::MONITORING, TableId::RESULTS],
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NavigateRequest {
    pub step: WorkflowStep,
}
