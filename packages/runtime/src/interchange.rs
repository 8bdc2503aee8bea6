//! XML import and export for blocks.
//!
//! Importing walks an interchange document top-down: aside annotations
//! (children carrying the family discriminator attribute) are detected,
//! stripped and instantiated before the host element itself is parsed;
//! then the host's type is resolved, ids are allocated, attributes hydrate
//! fields (reference fields resolve against the course), children recurse,
//! and the block is saved. Exporting reverses the walk and records the
//! serialized document in a resource filesystem.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use courseware_fields::{Scope, Value};
use courseware_keys::{DefinitionId, IdGenerator, ScopeIds, UsageId};

use crate::aside::AsideInstance;
use crate::block::BlockInstance;
use crate::error::Result;
use crate::runtime::AuthoringRuntime;
use crate::xml::XmlElement;

/// The attribute marking an embedded element as an aside annotation.
pub const ASIDE_FAMILY_ATTRIBUTE: &str = "block-family";

/// The family value emitted for asides.
pub const ASIDE_FAMILY: &str = "aside-v1";

/// Where exported documents and auxiliary resources land.
pub trait ResourceFs {
    fn write_file(&mut self, path: &str, contents: &[u8]) -> Result<()>;
}

/// In-memory resource filesystem.
#[derive(Default)]
pub struct MemoryFs {
    files: BTreeMap<String, Vec<u8>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(&self, path: &str) -> Option<&[u8]> {
        self.files.get(path).map(Vec::as_slice)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }
}

impl ResourceFs for MemoryFs {
    fn write_file(&mut self, path: &str, contents: &[u8]) -> Result<()> {
        self.files.insert(path.to_string(), contents.to_vec());
        Ok(())
    }
}

/// On-disk resource filesystem rooted at a directory.
pub struct DiskFs {
    root: PathBuf,
}

impl DiskFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ResourceFs for DiskFs {
    fn write_file(&mut self, path: &str, contents: &[u8]) -> Result<()> {
        let full = self.root.join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(full, contents)?;
        Ok(())
    }
}

/// Parse interchange XML into a hydrated, saved block tree.
pub fn from_xml(
    xml: &str,
    runtime: &Arc<AuthoringRuntime>,
    id_generator: &dyn IdGenerator,
) -> Result<Arc<BlockInstance>> {
    let root = XmlElement::parse(xml)?;
    block_from_node(&root, None, runtime, id_generator)
}

fn block_from_node(
    node: &XmlElement,
    parent: Option<&UsageId>,
    runtime: &Arc<AuthoringRuntime>,
    id_generator: &dyn IdGenerator,
) -> Result<Arc<BlockInstance>> {
    let mut node = node.clone();
    let block_type = node.tag.clone();
    node.remove_attr(ASIDE_FAMILY_ATTRIBUTE);
    let url_name = node.remove_attr("url_name");

    let def_id = id_generator.create_definition(&block_type, url_name.as_deref())?;
    let usage_id = id_generator.create_usage(&def_id)?;

    // Asides first: strip them out and instantiate them before the host
    // element is parsed.
    let aside_nodes = strip_asides(&mut node);
    let mut asides = Vec::with_capacity(aside_nodes.len());
    for aside_node in &aside_nodes {
        asides.push(aside_from_node(aside_node, &def_id, &usage_id, id_generator)?);
    }

    let scope_ids = ScopeIds::new(block_type.as_str(), def_id, usage_id.clone());
    let block = runtime.construct_block(scope_ids)?;

    let course = usage_id.course().clone();
    for (name, raw) in &node.attributes {
        match block.schema().get(name) {
            Some(descriptor) => {
                let value = descriptor.value_from_attribute(&course, raw)?;
                block.set_field(name, value)?;
            }
            None => {
                tracing::debug!(
                    attribute = %name,
                    block_type = %block_type,
                    "ignoring undeclared attribute"
                );
            }
        }
    }

    if !node.text.is_empty() && block.schema().contains("data") {
        block.set_field("data", Value::from(node.text.clone()))?;
    }

    let mut child_ids = Vec::with_capacity(node.children.len());
    let mut children = Vec::with_capacity(node.children.len());
    for child_node in &node.children {
        let child = block_from_node(child_node, Some(&usage_id), runtime, id_generator)?;
        child_ids.push(child.usage_id());
        children.push(child);
    }
    block.set_children(child_ids);
    block.prime_children(children);

    for aside in asides {
        block.add_aside(aside);
    }
    if let Some(parent) = parent {
        block.set_parent(parent.clone());
    }

    block.save();
    Ok(block)
}

fn strip_asides(node: &mut XmlElement) -> Vec<XmlElement> {
    let mut asides = Vec::new();
    let mut rest = Vec::with_capacity(node.children.len());
    for child in node.children.drain(..) {
        let is_aside = child
            .attr(ASIDE_FAMILY_ATTRIBUTE)
            .is_some_and(|family| family.starts_with("aside"));
        if is_aside {
            asides.push(child);
        } else {
            rest.push(child);
        }
    }
    node.children = rest;
    asides
}

fn aside_from_node(
    node: &XmlElement,
    def_id: &DefinitionId,
    usage_id: &UsageId,
    id_generator: &dyn IdGenerator,
) -> Result<AsideInstance> {
    let aside_type = node.tag.clone();
    let (aside_def, aside_usage) = id_generator.create_aside(def_id, usage_id, &aside_type)?;

    let mut data = BTreeMap::new();
    for (name, value) in &node.attributes {
        if name == ASIDE_FAMILY_ATTRIBUTE {
            continue;
        }
        data.insert(name.clone(), Value::from(value.as_str()));
    }
    Ok(AsideInstance::new(
        aside_def,
        aside_usage,
        data,
        node.text.clone(),
    ))
}

/// Serialize a block tree to interchange XML, recording the document in
/// the resource filesystem.
///
/// Exporting and re-importing under the same runtime yields a block with
/// equal scope ids and equal field values.
pub fn export_to_xml(block: &Arc<BlockInstance>, fs: &mut dyn ResourceFs) -> Result<String> {
    let node = node_from_block(block)?;
    let xml = node.to_xml();
    let ids = block.scope_ids();
    fs.write_file(
        &format!("{}/{}.xml", ids.block_type(), ids.usage_id().name()),
        xml.as_bytes(),
    )?;
    Ok(xml)
}

fn node_from_block(block: &Arc<BlockInstance>) -> Result<XmlElement> {
    let ids = block.scope_ids();
    let mut node = XmlElement::new(ids.block_type());
    node.set_attr("url_name", ids.usage_id().name());

    for descriptor in block.schema().iter() {
        if descriptor.scope == Scope::UserState {
            continue;
        }
        if !block.has_explicit(&descriptor.name)? {
            continue;
        }
        let value = block.get_field(&descriptor.name)?;
        if descriptor.name == "data" {
            node.text = value.to_attribute();
        } else {
            node.set_attr(descriptor.name.as_str(), value.to_attribute());
        }
    }

    for aside in block.asides() {
        let mut aside_node = XmlElement::new(aside.aside_type());
        aside_node.set_attr(ASIDE_FAMILY_ATTRIBUTE, ASIDE_FAMILY);
        for (name, value) in aside.data() {
            aside_node.set_attr(name.as_str(), value.to_attribute());
        }
        aside_node.text = aside.body().to_string();
        node.push_child(aside_node);
    }

    for child in block.get_children()? {
        node.push_child(node_from_block(&child)?);
    }
    Ok(node)
}
