//! Instances kept in the output.
//!
//! Top-level instances that were not selected, and instances components at
//! their depth limit, are concatenated into one instances component:
//!
//! - references are deduplicated across components and handles remapped
//! - transforms are prefixed with the transform of the enclosing instances
//! - generic attributes take the component's own value, else the inherited
//!   fallback, else the type default

use std::sync::Arc;

use super::attributes::{check_size, copy_generic_attributes, schema_writers, split_writers};
use super::gather::RealizeInstancesTask;
use super::schema::InstancesSchema;
use crate::attribute::{AttrDomain, AttributeAccessor, AttributeArray};
use crate::geom::instances::INSTANCE_ID;
use crate::geom::Instances;
use crate::util::{Error, Result};

/// Top-level instances missing from `selection`, or None if every instance
/// is expanded.
pub(crate) fn unselected_instances(instances: &Instances, selection: &[(usize, Option<u32>)]) -> Option<Arc<Instances>> {
    let mut selected = vec![false; instances.num_instances()];
    for &(i, _) in selection {
        selected[i] = true;
    }
    let rest: Vec<usize> = (0..instances.num_instances()).filter(|&i| !selected[i]).collect();
    (!rest.is_empty()).then(|| Arc::new(instances.subset(&rest)))
}

/// Merge the instances of all tasks into one component.
#[tracing::instrument(skip_all, fields(tasks = tasks.len()))]
pub(crate) fn execute_instances_tasks(schema: &InstancesSchema, tasks: &[RealizeInstancesTask]) -> Result<Instances> {
    let counts: Vec<usize> = tasks.iter().map(|task| task.instances.num_instances()).collect();
    let total = counts.iter().sum();
    check_size("instances", total)?;

    let mut result = Instances::new();
    let mut ids = schema.create_id.then(|| Vec::with_capacity(total));
    let mut writers = schema_writers(&schema.attributes, |_| total);
    let outputs = split_writers(&mut writers, tasks.len(), |task, _| counts[task]);

    for (task, mut attributes) in tasks.iter().zip(outputs) {
        let src = &task.instances;
        let handle_map: Vec<u32> = src
            .references()
            .iter()
            .map(|reference| result.add_reference(reference.clone()))
            .collect();
        for (&handle, transform) in src.handles().iter().zip(src.transforms()) {
            let mapped = handle_map.get(handle as usize).copied().ok_or(Error::InvalidHandle {
                handle: handle as usize,
                count: handle_map.len(),
            })?;
            result.add_instance(mapped, task.transform * *transform)?;
        }

        let own: Vec<Option<AttributeArray>> = schema
            .attributes
            .iter()
            .map(|(name, kind)| src.lookup(name, kind.domain, kind.data_type))
            .collect();
        copy_generic_attributes(&own, &task.fallbacks, &mut attributes);

        if let Some(ids) = ids.as_mut() {
            match src.stored_ids().filter(|_| !task.ids_stripped) {
                Some(stored) => ids.extend_from_slice(stored),
                None => ids.resize(ids.len() + src.num_instances(), 0),
            }
        }
    }

    for writer in writers {
        writer.finish(&mut result)?;
    }
    if let Some(ids) = ids {
        result.add_attribute(INSTANCE_ID, AttrDomain::Instance, AttributeArray::from_vec(ids))?;
    }
    Ok(result)
}
