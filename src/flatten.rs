//! Flattening and validation of the command/attribute forest.
//!
//! Every generator pass works from the flat, parent-tagged list built here rather than
//! walking the trees itself. [`prepare`] validates a protocol and bundles the list together
//! with the protocol-wide `has_sub_attributes` flag into a [`GenContext`], which is the only
//! way the generators receive it.

use crate::model::{Attribute, Command, DataType, Direction, Protocol};
use crate::resolve::{capitalize, snake_case};
use std::collections::HashSet;

/// One attribute of the flattened forest.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeInfo<'a> {
    /// Name of the immediate parent: the command for top-level attributes, else the complex attribute.
    pub parent_name: &'a str,
    /// Names from the command down to the immediate parent.
    pub ancestors: Vec<&'a str>,
    /// 0-based declaration index among the parent's attributes.
    pub index: usize,
    pub attribute: &'a Attribute,
    pub sub_attribute_count: usize,
}

/// Validated protocol plus the flattened attribute list shared by all generator passes.
#[derive(Debug, Clone)]
pub struct GenContext<'a> {
    pub protocol: &'a Protocol,
    /// Pre-order list over every command's attributes.
    pub infos: Vec<AttributeInfo<'a>>,
    /// True when at least one `SUB_ATTRIBUTES` attribute has children.
    pub has_sub_attributes: bool,
}

impl<'a> GenContext<'a> {
    /// Complex attributes with children, children listed before their parents.
    pub fn complex_attributes_children_first(&self) -> Vec<&AttributeInfo<'a>> {
        if !self.has_sub_attributes {
            return Vec::new();
        }
        self.infos
            .iter()
            .rev()
            .filter(|info| info.attribute.has_sub_attributes())
            .collect()
    }

    /// Infos grouped by parent scope, see [`sort_by_parent_name`].
    pub fn sorted_by_parent(&self) -> Vec<AttributeInfo<'a>> {
        let mut sorted = self.infos.clone();
        sort_by_parent_name(&mut sorted);
        sorted
    }

    /// One entry per parent scope, ordered by parent name.
    pub fn scopes(&self) -> Vec<Scope<'a>> {
        let mut scopes: Vec<Scope<'a>> = Vec::new();
        for info in self.sorted_by_parent() {
            match scopes.last_mut() {
                Some(scope) if scope.parent_name == info.parent_name => scope.attributes.push(info),
                _ => scopes.push(Scope {
                    parent_name: info.parent_name,
                    attributes: vec![info],
                }),
            }
        }
        scopes
    }
}

/// Attributes sharing one parent, in declaration order.
#[derive(Debug, Clone)]
pub struct Scope<'a> {
    pub parent_name: &'a str,
    pub attributes: Vec<AttributeInfo<'a>>,
}

impl Scope<'_> {
    pub fn has_optional(&self) -> bool {
        self.attributes.iter().any(|info| info.attribute.optional)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("protocol has no commands")]
    NoCommands,
    #[error("invalid identifier: {0:?}")]
    InvalidName(String),
    #[error("command {0} has an unknown direction")]
    UnknownDirection(String),
    #[error("attribute {0} has an unknown data type")]
    UnknownDataType(String),
    #[error("negative id {id} on {name}")]
    NegativeId { name: String, id: i16 },
    #[error("duplicate command id {id} ({first} and {second})")]
    DuplicateCommandId { id: i16, first: String, second: String },
    #[error("duplicate command name: {0}")]
    DuplicateCommandName(String),
    #[error("duplicate attribute id {id} under {parent}")]
    DuplicateAttributeId { parent: String, id: i16 },
    #[error("duplicate attribute name {name} under {parent}")]
    DuplicateAttributeName { parent: String, name: String },
    #[error("attribute {0} has children but is not of type sub_attributes")]
    UnexpectedChildren(String),
    #[error("attribute {0} is of type sub_attributes but has no children")]
    EmptySubAttributes(String),
    #[error("duplicate complex attribute name: {0}")]
    DuplicateComplexName(String),
    #[error("complex attribute {0} has the same name as a command")]
    ComplexNameClash(String),
    #[error("{first} and {second} produce the same generated identifier under {scope}")]
    IdentifierCollision { scope: String, first: String, second: String },
}

/// Validate and flatten `protocol`.
pub fn prepare(protocol: &Protocol) -> Result<GenContext<'_>, ValidationError> {
    validate(protocol)?;
    let (infos, has_sub_attributes) = flatten(&protocol.commands);
    tracing::debug!(
        protocol = %protocol.name,
        attributes = infos.len(),
        has_sub_attributes,
        "flattened attribute forest"
    );
    Ok(GenContext {
        protocol,
        infos,
        has_sub_attributes,
    })
}

/// Depth-first walk over every command's attribute forest.
///
/// Returns the pre-order list and whether any `SUB_ATTRIBUTES` attribute holds children.
pub fn flatten(commands: &[Command]) -> (Vec<AttributeInfo<'_>>, bool) {
    let mut infos = Vec::new();
    let mut has_sub_attributes = false;
    for cmd in commands {
        flatten_rec(
            &cmd.attributes,
            &[cmd.name.as_str()],
            &mut infos,
            &mut has_sub_attributes,
        );
    }
    (infos, has_sub_attributes)
}

fn flatten_rec<'a>(
    attributes: &'a [Attribute],
    ancestors: &[&'a str],
    infos: &mut Vec<AttributeInfo<'a>>,
    has_sub_attributes: &mut bool,
) {
    let parent_name = ancestors.last().copied().unwrap_or_default();
    for (index, att) in attributes.iter().enumerate() {
        infos.push(AttributeInfo {
            parent_name,
            ancestors: ancestors.to_vec(),
            index,
            attribute: att,
            sub_attribute_count: att.children.len(),
        });
        if att.has_sub_attributes() {
            *has_sub_attributes = true;
            let mut chain = ancestors.to_vec();
            chain.push(att.name.as_str());
            flatten_rec(&att.children, &chain, infos, has_sub_attributes);
        }
    }
}

/// Stable insertion sort grouping entries by parent name.
pub fn sort_by_parent_name(infos: &mut [AttributeInfo<'_>]) {
    for i in 1..infos.len() {
        let mut j = i;
        while j > 0 && infos[j - 1].parent_name > infos[j].parent_name {
            infos.swap(j - 1, j);
            j -= 1;
        }
    }
}

/// First `SUB_ATTRIBUTES` name seen twice anywhere in the protocol.
pub fn find_duplicate_complex_attribute_name(commands: &[Command]) -> Option<String> {
    let mut seen = HashSet::new();
    commands
        .iter()
        .find_map(|cmd| find_duplicate_rec(&cmd.attributes, &mut seen))
}

fn find_duplicate_rec<'a>(attributes: &'a [Attribute], seen: &mut HashSet<&'a str>) -> Option<String> {
    for att in attributes {
        if att.data_type != DataType::SubAttributes {
            continue;
        }
        if !seen.insert(att.name.as_str()) {
            return Some(att.name.clone());
        }
        if let Some(dup) = find_duplicate_rec(&att.children, seen) {
            return Some(dup);
        }
    }
    None
}

/// Check every schema invariant. Must pass before any file is produced.
pub fn validate(protocol: &Protocol) -> Result<(), ValidationError> {
    if protocol.commands.is_empty() {
        return Err(ValidationError::NoCommands);
    }
    check_name(&protocol.name)?;

    let mut ids: Vec<(i16, &str)> = Vec::new();
    let mut names = HashSet::new();
    let mut idents = IdentifierSet::default();
    for cmd in &protocol.commands {
        check_name(&cmd.name)?;
        if cmd.direction == Direction::Unknown {
            return Err(ValidationError::UnknownDirection(cmd.name.clone()));
        }
        if cmd.id < 0 {
            return Err(ValidationError::NegativeId {
                name: cmd.name.clone(),
                id: cmd.id,
            });
        }
        if let Some((_, first)) = ids.iter().find(|(id, _)| *id == cmd.id) {
            return Err(ValidationError::DuplicateCommandId {
                id: cmd.id,
                first: first.to_string(),
                second: cmd.name.clone(),
            });
        }
        ids.push((cmd.id, cmd.name.as_str()));
        if !names.insert(cmd.name.as_str()) {
            return Err(ValidationError::DuplicateCommandName(cmd.name.clone()));
        }
        idents.insert(&protocol.name, &cmd.name)?;
        validate_scope(&cmd.name, &cmd.attributes)?;
    }

    if let Some(dup) = find_duplicate_complex_attribute_name(&protocol.commands) {
        return Err(ValidationError::DuplicateComplexName(dup));
    }
    let (infos, _) = flatten(&protocol.commands);
    if let Some(clash) = infos
        .iter()
        .find(|info| info.attribute.is_complex() && names.contains(info.attribute.name.as_str()))
    {
        return Err(ValidationError::ComplexNameClash(clash.attribute.name.clone()));
    }
    // complex names become attribute scopes next to the command scopes
    for info in infos.iter().filter(|info| info.attribute.is_complex()) {
        idents.insert(&protocol.name, &info.attribute.name)?;
    }
    Ok(())
}

fn validate_scope(parent: &str, attributes: &[Attribute]) -> Result<(), ValidationError> {
    let mut ids = HashSet::new();
    let mut names = HashSet::new();
    let mut idents = IdentifierSet::default();
    for att in attributes {
        check_name(&att.name)?;
        if att.data_type == DataType::Unknown {
            return Err(ValidationError::UnknownDataType(att.name.clone()));
        }
        if att.id < 0 {
            return Err(ValidationError::NegativeId {
                name: att.name.clone(),
                id: att.id,
            });
        }
        if !ids.insert(att.id) {
            return Err(ValidationError::DuplicateAttributeId {
                parent: parent.to_string(),
                id: att.id,
            });
        }
        if !names.insert(att.name.as_str()) {
            return Err(ValidationError::DuplicateAttributeName {
                parent: parent.to_string(),
                name: att.name.clone(),
            });
        }
        idents.insert(parent, &att.name)?;
        if att.is_complex() {
            if att.children.is_empty() {
                return Err(ValidationError::EmptySubAttributes(att.name.clone()));
            }
            validate_scope(&att.name, &att.children)?;
        } else if !att.children.is_empty() {
            return Err(ValidationError::UnexpectedChildren(att.name.clone()));
        }
    }
    Ok(())
}

/// Names already used in one scope, compared the way the generators spell them:
/// upper case for C enums and defines, `capitalize` and `snake_case` for Rust.
#[derive(Default)]
struct IdentifierSet<'a> {
    seen: Vec<(&'a str, [String; 3])>,
}

impl<'a> IdentifierSet<'a> {
    fn insert(&mut self, scope: &str, name: &'a str) -> Result<(), ValidationError> {
        let keys = [name.to_uppercase(), capitalize(name), snake_case(name)];
        if let Some((first, _)) = self
            .seen
            .iter()
            .find(|(_, seen)| seen.iter().zip(&keys).any(|(a, b)| a == b))
        {
            return Err(ValidationError::IdentifierCollision {
                scope: scope.to_string(),
                first: first.to_string(),
                second: name.to_string(),
            });
        }
        self.seen.push((name, keys));
        Ok(())
    }
}

fn check_name(name: &str) -> Result<(), ValidationError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidName(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Direction;

    fn nested_protocol() -> Protocol {
        Protocol::new("Test", 1)
            .with_command(
                Command::new("CC3", 3, Direction::BToA)
                    .with_attribute(Attribute::new("SA1", 0, DataType::Uint8))
                    .with_attribute(
                        Attribute::new("CA1", 1, DataType::SubAttributes)
                            .with_child(Attribute::new("SA2", 0, DataType::Uint16))
                            .with_child(
                                Attribute::new("CA2", 1, DataType::SubAttributes)
                                    .with_child(Attribute::new("SA3", 0, DataType::String)),
                            ),
                    )
                    .with_attribute(Attribute::new("SA4", 2, DataType::Float32)),
            )
            .with_command(
                Command::new("CC1", 1, Direction::AToB)
                    .with_attribute(Attribute::new("SA5", 5, DataType::Uint8).optional(true)),
            )
    }

    #[test]
    fn flatten_is_pre_order_with_parents() {
        let proto = nested_protocol();
        let (infos, has_sub) = flatten(&proto.commands);
        assert!(has_sub);
        let names: Vec<_> = infos
            .iter()
            .map(|i| (i.parent_name, i.attribute.name.as_str()))
            .collect();
        assert_eq!(
            names,
            vec![
                ("CC3", "SA1"),
                ("CC3", "CA1"),
                ("CA1", "SA2"),
                ("CA1", "CA2"),
                ("CA2", "SA3"),
                ("CC3", "SA4"),
                ("CC1", "SA5"),
            ]
        );
        assert_eq!(infos[4].ancestors, vec!["CC3", "CA1", "CA2"]);
        assert_eq!(infos[5].index, 2);
        assert_eq!(infos[1].sub_attribute_count, 2);
    }

    #[test]
    fn flatten_without_complex_attributes() {
        let proto = Protocol::new("P", 1).with_command(
            Command::new("C", 0, Direction::AToB).with_attribute(Attribute::new("A", 0, DataType::Uint8)),
        );
        let (_, has_sub) = flatten(&proto.commands);
        assert!(!has_sub);
    }

    #[test]
    fn sort_groups_by_parent_and_is_stable() {
        let proto = nested_protocol();
        let (mut infos, _) = flatten(&proto.commands);
        sort_by_parent_name(&mut infos);
        let parents: Vec<_> = infos.iter().map(|i| i.parent_name).collect();
        assert_eq!(parents, vec!["CA1", "CA1", "CA2", "CC1", "CC3", "CC3", "CC3"]);
        let cc3: Vec<_> = infos
            .iter()
            .filter(|i| i.parent_name == "CC3")
            .map(|i| i.attribute.name.as_str())
            .collect();
        assert_eq!(cc3, vec!["SA1", "CA1", "SA4"]);
    }

    #[test]
    fn complex_children_first() {
        let proto = nested_protocol();
        let ctx = prepare(&proto).expect("valid");
        let order: Vec<_> = ctx
            .complex_attributes_children_first()
            .iter()
            .map(|i| i.attribute.name.as_str())
            .collect();
        assert_eq!(order, vec!["CA2", "CA1"]);
    }

    #[test]
    fn duplicate_complex_name_is_found_across_commands() {
        let proto = nested_protocol().with_command(
            Command::new("CC4", 4, Direction::AToB).with_attribute(
                Attribute::new("CA2", 0, DataType::SubAttributes)
                    .with_child(Attribute::new("X", 0, DataType::Uint8)),
            ),
        );
        assert_eq!(
            find_duplicate_complex_attribute_name(&proto.commands).as_deref(),
            Some("CA2")
        );
        assert_eq!(
            validate(&proto),
            Err(ValidationError::DuplicateComplexName("CA2".into()))
        );
    }

    #[test]
    fn duplicate_scalar_names_in_different_scopes_are_fine() {
        let proto = nested_protocol().with_command(
            Command::new("CC5", 5, Direction::AToB).with_attribute(Attribute::new("SA1", 0, DataType::Uint8)),
        );
        assert_eq!(find_duplicate_complex_attribute_name(&proto.commands), None);
        assert!(validate(&proto).is_ok());
    }

    #[test]
    fn rejects_duplicate_ids() {
        let proto = nested_protocol().with_command(Command::new("CC9", 3, Direction::AToB));
        assert!(matches!(
            validate(&proto),
            Err(ValidationError::DuplicateCommandId { id: 3, .. })
        ));

        let proto = Protocol::new("P", 1).with_command(
            Command::new("C", 0, Direction::AToB)
                .with_attribute(Attribute::new("A", 4, DataType::Uint8))
                .with_attribute(Attribute::new("B", 4, DataType::Uint8)),
        );
        assert_eq!(
            validate(&proto),
            Err(ValidationError::DuplicateAttributeId {
                parent: "C".into(),
                id: 4
            })
        );
    }

    #[test]
    fn rejects_structural_errors() {
        assert_eq!(validate(&Protocol::new("P", 1)), Err(ValidationError::NoCommands));

        let bad_children = Protocol::new("P", 1).with_command(
            Command::new("C", 0, Direction::AToB).with_attribute(
                Attribute::new("A", 0, DataType::Uint8).with_child(Attribute::new("B", 0, DataType::Uint8)),
            ),
        );
        assert_eq!(
            validate(&bad_children),
            Err(ValidationError::UnexpectedChildren("A".into()))
        );

        let unknown = Protocol::new("P", 1).with_command(
            Command::new("C", 0, Direction::AToB).with_attribute(Attribute::new("A", 0, DataType::Unknown)),
        );
        assert_eq!(validate(&unknown), Err(ValidationError::UnknownDataType("A".into())));

        let bad_name = Protocol::new("P", 1).with_command(Command::new("9lives", 0, Direction::AToB));
        assert_eq!(validate(&bad_name), Err(ValidationError::InvalidName("9lives".into())));

        let clash = Protocol::new("P", 1)
            .with_command(Command::new("CA", 0, Direction::AToB))
            .with_command(
                Command::new("C", 1, Direction::AToB).with_attribute(
                    Attribute::new("CA", 0, DataType::SubAttributes)
                        .with_child(Attribute::new("X", 0, DataType::Uint8)),
                ),
            );
        assert_eq!(validate(&clash), Err(ValidationError::ComplexNameClash("CA".into())));
    }

    #[test]
    fn rejects_names_differing_only_in_spelling() {
        let commands = Protocol::new("Test", 1)
            .with_command(Command::new("Ping", 1, Direction::AToB))
            .with_command(Command::new("PING", 2, Direction::AToB));
        assert_eq!(
            validate(&commands),
            Err(ValidationError::IdentifierCollision {
                scope: "Test".into(),
                first: "Ping".into(),
                second: "PING".into(),
            })
        );

        let attributes = Protocol::new("Test", 1).with_command(
            Command::new("CC1", 1, Direction::AToB)
                .with_attribute(Attribute::new("Sa1", 0, DataType::Uint8))
                .with_attribute(Attribute::new("SA1", 1, DataType::Uint8)),
        );
        assert!(matches!(
            validate(&attributes),
            Err(ValidationError::IdentifierCollision { ref scope, .. }) if scope == "CC1"
        ));

        // same Rust variant `Cc1`
        let rust_only = Protocol::new("Test", 1)
            .with_command(Command::new("CC_1", 1, Direction::AToB))
            .with_command(Command::new("CC1", 2, Direction::AToB));
        assert!(matches!(
            validate(&rust_only),
            Err(ValidationError::IdentifierCollision { .. })
        ));

        let scope_clash = Protocol::new("Test", 1)
            .with_command(Command::new("Ca", 0, Direction::AToB))
            .with_command(
                Command::new("C", 1, Direction::AToB).with_attribute(
                    Attribute::new("CA", 0, DataType::SubAttributes)
                        .with_child(Attribute::new("X", 0, DataType::Uint8)),
                ),
            );
        assert!(matches!(
            validate(&scope_clash),
            Err(ValidationError::IdentifierCollision { .. })
        ));

        // distinct names in separate scopes stay valid
        assert!(validate(&nested_protocol()).is_ok());
    }
}
