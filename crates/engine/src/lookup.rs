// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Finding the operation a command applies to

use crate::error::FsmError;
use orbit_core::{resolve_plan, Operation, OperationPlan};
use orbit_storage::Backend;

/// The most recent operation and its resolved plan.
///
/// Fails with a not-found error when there is no operation, or when the
/// operation was never given a plan.
pub fn get_operation_plan(backend: &impl Backend) -> Result<(Operation, OperationPlan), FsmError> {
    let operation = backend.get_last_operation().map_err(|e| {
        if e.is_not_found() {
            FsmError::OperationNotFound(None)
        } else {
            e.into()
        }
    })?;

    let base = backend
        .get_operation_plan(&operation.site_domain, &operation.id)
        .map_err(|e| {
            if e.is_not_found() {
                FsmError::PlanNotFound {
                    operation_type: operation.operation_type,
                }
            } else {
                e.into()
            }
        })?;
    let changelog = backend.get_operation_plan_changelog(&operation.site_domain, &operation.id)?;

    let plan = resolve_plan(&base, &changelog);
    Ok((operation, plan))
}

#[cfg(test)]
#[path = "lookup_tests.rs"]
mod tests;
