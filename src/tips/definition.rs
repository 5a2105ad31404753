use crate::tips::rule::{ParamValue, Rule};
use crate::tips::TipError;

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDecl {
    pub name: String,
    pub default: ParamValue,
}

/// Button shown inside a tip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TipAction {
    pub id: String,
    pub title: String,
}

/// Static description of a tip. Built once at startup and never mutated.
///
/// A tip is eligible when every rule holds. With no rules at all it is
/// always eligible.
#[derive(Debug, Clone, PartialEq)]
pub struct TipDefinition {
    pub id: String,
    pub title: String,
    pub message: Option<String>,
    /// Symbol name of the tip image.
    pub image: Option<String>,
    pub actions: Vec<TipAction>,
    pub parameters: Vec<ParameterDecl>,
    pub rules: Vec<Rule>,
}

impl TipDefinition {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            message: None,
            image: None,
            actions: Vec::new(),
            parameters: Vec::new(),
            rules: Vec::new(),
        }
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn action(mut self, id: impl Into<String>, title: impl Into<String>) -> Self {
        self.actions.push(TipAction {
            id: id.into(),
            title: title.into(),
        });
        self
    }

    pub fn parameter(mut self, name: impl Into<String>, default: impl Into<ParamValue>) -> Self {
        self.parameters.push(ParameterDecl {
            name: name.into(),
            default: default.into(),
        });
        self
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn parameter_decl(&self, name: &str) -> Option<&ParameterDecl> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn has_action(&self, action_id: &str) -> bool {
        self.actions.iter().any(|a| a.id == action_id)
    }
}

/// Set of tip definitions keyed by unique id, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct TipCatalog {
    tips: Vec<TipDefinition>,
}

impl TipCatalog {
    pub fn new(tips: Vec<TipDefinition>) -> Result<Self, TipError> {
        let mut catalog = Self::default();
        for tip in tips {
            catalog.insert(tip)?;
        }
        Ok(catalog)
    }

    fn insert(&mut self, tip: TipDefinition) -> Result<(), TipError> {
        if self.get(&tip.id).is_some() {
            return Err(TipError::DuplicateTip(tip.id));
        }
        self.tips.push(tip);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&TipDefinition> {
        self.tips.iter().find(|t| t.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TipDefinition> {
        self.tips.iter()
    }

    pub fn len(&self) -> usize {
        self.tips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tips.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let tip = TipDefinition::new("add", "Add more items.")
            .message("You can add more items to the feed here.")
            .image("plus")
            .action("add", "Add")
            .parameter("isPro", false)
            .rule(Rule::parameter("isPro", true));

        assert_eq!(tip.image.as_deref(), Some("plus"));
        assert!(tip.has_action("add"));
        assert!(!tip.has_action("remove"));
        assert_eq!(
            tip.parameter_decl("isPro").map(|p| &p.default),
            Some(&ParamValue::Bool(false))
        );
        assert_eq!(tip.rules.len(), 1);
    }

    #[test]
    fn test_catalog_rejects_duplicate_ids() {
        let result = TipCatalog::new(vec![
            TipDefinition::new("add", "Add"),
            TipDefinition::new("add", "Add again"),
        ]);
        assert!(matches!(result, Err(TipError::DuplicateTip(id)) if id == "add"));
    }

    #[test]
    fn test_catalog_keeps_declaration_order() {
        let catalog = TipCatalog::new(vec![
            TipDefinition::new("remove", "Delete items"),
            TipDefinition::new("add", "Add more items."),
        ])
        .unwrap();
        let ids: Vec<&str> = catalog.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["remove", "add"]);
        assert_eq!(catalog.len(), 2);
    }
}
