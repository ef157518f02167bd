//! Order resolution and buildpack graph validation
//!
//! Both checks run before any layer is written, so a builder can never be
//! committed with a dangling or ambiguous buildpack reference.

use std::collections::HashSet;

use tracing::debug;

use crate::buildpack::{Buildpack, BuildpackInfo};
use crate::error::{BuilderError, BuilderResult};
use crate::metadata::BuildpackMetadata;
use crate::order::{Order, OrderEntry};

/// Resolve every reference of `order` against the buildpacks known to the
/// builder, filling in missing versions.
///
/// Matching is by exact id. A reference without a version resolves only when
/// exactly one version of that id is known.
pub fn resolve_order(order: &Order, known: &[BuildpackMetadata]) -> BuilderResult<Order> {
    let mut entries = Vec::with_capacity(order.len());

    for entry in order.entries() {
        let mut group = Vec::with_capacity(entry.group.len());

        for bp_ref in &entry.group {
            let matching: Vec<&BuildpackInfo> = known
                .iter()
                .map(|bp| &bp.info)
                .filter(|info| info.id == bp_ref.id)
                .collect();

            if matching.is_empty() {
                return Err(BuilderError::BuildpackNotFound {
                    id: bp_ref.id.clone(),
                });
            }

            let mut resolved = bp_ref.clone();
            if resolved.version.is_empty() {
                if matching.len() > 1 {
                    return Err(BuilderError::AmbiguousBuildpackVersion {
                        id: bp_ref.id.clone(),
                    });
                }
                resolved.version = matching[0].version.clone();
                debug!("Resolved {} to version {}", resolved.id, resolved.version);
            }

            if !matching.iter().any(|info| info.version == resolved.version) {
                return Err(BuilderError::BuildpackVersionNotFound {
                    id: resolved.id,
                    version: resolved.version,
                });
            }

            group.push(resolved);
        }

        entries.push(OrderEntry::new(group));
    }

    Ok(Order::new(entries))
}

/// Check the buildpacks embedded in this pass against the builder stack and
/// against each other.
///
/// Each buildpack declares either stacks or a nested order, never both and
/// never neither. Declared stacks must include `stack_id`, and every
/// reference of a nested order must name an embedded buildpack.
pub fn validate_buildpacks(stack_id: &str, buildpacks: &[Buildpack]) -> BuilderResult<()> {
    let lookup: HashSet<(&str, &str)> = buildpacks
        .iter()
        .map(|bp| (bp.info.id.as_str(), bp.info.version.as_str()))
        .collect();

    for bp in buildpacks {
        let has_order = !bp.order.is_empty();
        let has_stacks = !bp.stacks.is_empty();

        if !has_order && !has_stacks {
            return Err(BuilderError::MissingStacksOrOrder {
                buildpack: bp.info.to_string(),
            });
        }

        if has_order && has_stacks {
            return Err(BuilderError::BothStacksAndOrder {
                buildpack: bp.info.to_string(),
            });
        }

        if has_stacks && !bp.supports_stack(stack_id) {
            return Err(BuilderError::UnsupportedStack {
                buildpack: bp.info.to_string(),
                stack: stack_id.to_string(),
            });
        }

        for nested in bp.order.refs() {
            if !lookup.contains(&(nested.id.as_str(), nested.version.as_str())) {
                return Err(BuilderError::NestedBuildpackNotFound {
                    buildpack: nested.info().to_string(),
                });
            }
        }
    }

    Ok(())
}
