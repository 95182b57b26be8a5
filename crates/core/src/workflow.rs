//! Workflows of dependent steps
//!
//! A [`WorkflowSystem`] holds named steps, each wrapping an operation and
//! the names of steps that must complete before it runs. Steps can be run
//! one at a time with [`execute_step`](WorkflowSystem::execute_step), which
//! rejects a step whose dependencies have not completed, or all together
//! with [`execute_all`](WorkflowSystem::execute_all) in dependency order.

use crate::error::{Error, Result};
use crate::operation::OperationRef;
use crate::state::State;
use std::collections::BTreeSet;
use tracing::debug;

/// One named unit of work
#[derive(Debug, Clone)]
pub struct WorkflowStep {
    /// Unique within a workflow
    pub name: String,
    /// Applied to the workflow's current state
    pub operation: OperationRef,
    /// Informational; every registered step runs under `execute_all`
    pub required: bool,
    /// Steps that must complete first
    pub dependencies: Vec<String>,
}

impl WorkflowStep {
    /// A required step with no dependencies
    pub fn new(name: impl Into<String>, operation: OperationRef) -> Self {
        WorkflowStep {
            name: name.into(),
            operation,
            required: true,
            dependencies: Vec::new(),
        }
    }

    /// Add a dependency
    pub fn depends_on(mut self, step: impl Into<String>) -> Self {
        self.dependencies.push(step.into());
        self
    }

    /// Mark as not required
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// Steps, their completion status and the state they have produced
#[derive(Debug, Clone, Default)]
pub struct WorkflowSystem {
    steps: Vec<WorkflowStep>,
    completed: BTreeSet<String>,
    current: State,
}

impl WorkflowSystem {
    /// Empty workflow starting from `initial`
    pub fn new(initial: State) -> Self {
        WorkflowSystem {
            steps: Vec::new(),
            completed: BTreeSet::new(),
            current: initial,
        }
    }

    /// Register a step as not yet completed
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if the name is empty or already registered.
    pub fn add_step(&mut self, step: WorkflowStep) -> Result<()> {
        if step.name.trim().is_empty() {
            return Err(Error::InvalidArgument("Step name cannot be empty".to_string()));
        }
        if self.find(&step.name).is_some() {
            return Err(Error::InvalidArgument(format!(
                "Step {} is already registered",
                step.name
            )));
        }
        self.completed.remove(&step.name);
        self.steps.push(step);
        Ok(())
    }

    /// Registered steps, in registration order
    pub fn steps(&self) -> &[WorkflowStep] {
        &self.steps
    }

    /// State after every completed step
    pub fn current_state(&self) -> &State {
        &self.current
    }

    /// Whether `name` has completed since the last reset
    pub fn is_completed(&self, name: &str) -> bool {
        self.completed.contains(name)
    }

    /// Names of completed steps, sorted
    pub fn completed_steps(&self) -> impl Iterator<Item = &str> {
        self.completed.iter().map(String::as_str)
    }

    /// Run one step against the current state
    ///
    /// A step that already completed runs again. On failure the state and
    /// completion status are unchanged.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` for an empty name
    /// - `StepNotFound` for an unknown name
    /// - `UnmetDependency` naming the first dependency not yet completed
    /// - any error from the step's operation
    pub fn execute_step(&mut self, name: &str) -> Result<&State> {
        if name.trim().is_empty() {
            return Err(Error::InvalidArgument("Step name cannot be empty".to_string()));
        }
        let step = self
            .find(name)
            .ok_or_else(|| Error::StepNotFound(name.to_string()))?;

        if let Some(missing) = step
            .dependencies
            .iter()
            .find(|dep| !self.completed.contains(dep.as_str()))
        {
            return Err(Error::UnmetDependency {
                step: name.to_string(),
                dependency: missing.clone(),
            });
        }

        let next = step.operation.execute(&self.current)?;
        debug!(target: "ordersense::system", step = name, "Workflow step completed");
        self.current = next;
        self.completed.insert(name.to_string());
        Ok(&self.current)
    }

    /// Step names ordered so that every step follows its dependencies
    ///
    /// Ties are broken by registration order.
    ///
    /// # Errors
    ///
    /// `StepNotFound` if a dependency names no registered step,
    /// `CircularDependency` if the dependencies form a cycle.
    pub fn execution_order(&self) -> Result<Vec<String>> {
        let mut order = Vec::with_capacity(self.steps.len());
        let mut visited = BTreeSet::new();
        let mut visiting = BTreeSet::new();
        for step in &self.steps {
            self.visit(&step.name, &mut visited, &mut visiting, &mut order)?;
        }
        Ok(order)
    }

    /// Run every step in dependency order
    ///
    /// Stops at the first failing step; steps before it stay completed.
    pub fn execute_all(&mut self) -> Result<&State> {
        let order = self.execution_order()?;
        for name in &order {
            self.execute_step(name)?;
        }
        Ok(&self.current)
    }

    /// Replace the current state and mark every step incomplete
    pub fn reset(&mut self, initial: State) {
        self.current = initial;
        self.completed.clear();
    }

    fn find(&self, name: &str) -> Option<&WorkflowStep> {
        self.steps.iter().find(|s| s.name == name)
    }

    fn visit<'a>(
        &'a self,
        name: &'a str,
        visited: &mut BTreeSet<&'a str>,
        visiting: &mut BTreeSet<&'a str>,
        order: &mut Vec<String>,
    ) -> Result<()> {
        if visited.contains(name) {
            return Ok(());
        }
        if !visiting.insert(name) {
            return Err(Error::CircularDependency(name.to_string()));
        }
        let step = self
            .find(name)
            .ok_or_else(|| Error::StepNotFound(name.to_string()))?;
        for dep in &step.dependencies {
            self.visit(dep, visited, visiting, order)?;
        }
        visiting.remove(name);
        visited.insert(name);
        order.push(name.to_string());
        Ok(())
    }
}
