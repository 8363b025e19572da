//! Tunnel Manager - drives one action through the executor, fail-fast

use tracing::{debug, info, warn};
use tunnelmgr_common::{exec, CommandExecutor, Invocation, TunnelError, TunnelResult};

use crate::commands::CommandBuilder;
use crate::types::{Action, ProbeParams, TunnelParams, TunnelTarget, TunnelType};

/// Output of one executed step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutput {
    /// Rendered command line
    pub command: String,
    /// Combined stdout/stderr of the command
    pub output: String,
}

/// Record of a completed action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionReport {
    pub action: Action,
    pub steps: Vec<StepOutput>,
}

impl ActionReport {
    /// Command lines in execution order
    pub fn commands(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.command.as_str()).collect()
    }

    /// Concatenated output of all steps
    pub fn output(&self) -> String {
        self.steps.iter().map(|s| s.output.as_str()).collect()
    }
}

/// Tunnel Manager
///
/// Builds the command sequence of an action and runs it through the
/// injected executor strictly in order. The first failing step aborts the
/// action; steps that already ran are not rolled back.
pub struct TunnelMgr<E> {
    executor: E,
    commands: CommandBuilder,
}

impl<E: CommandExecutor> TunnelMgr<E> {
    /// Create a manager with default tool names and the `ip` bridge tool
    pub fn new(executor: E) -> Self {
        Self::with_commands(executor, CommandBuilder::default())
    }

    pub fn with_commands(executor: E, commands: CommandBuilder) -> Self {
        Self { executor, commands }
    }

    pub fn commands(&self) -> &CommandBuilder {
        &self.commands
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Create the tunnel link, bring it up and attach it to the bridge
    pub async fn create_tunnel(&self, params: &TunnelParams) -> TunnelResult<ActionReport> {
        if params.src_port != params.tunnel_type.default_port() {
            debug!(
                src_port = params.src_port,
                "Source port is not part of the link configuration, ignoring"
            );
        }

        let report = self
            .run_sequence(Action::Create, self.commands.create_sequence(params))
            .await?;

        info!(
            "Tunnel {} created (vni {}, {} -> {}, bridge {})",
            params.interface_name(),
            params.vni,
            params.src_host,
            params.dst_host,
            params.bridge_name
        );
        Ok(report)
    }

    /// Detach the tunnel from its bridge and delete it
    pub async fn cleanup_tunnel(&self, target: &TunnelTarget) -> TunnelResult<ActionReport> {
        let report = self
            .run_sequence(Action::Cleanup, self.commands.cleanup_sequence(target))
            .await?;

        info!(
            "Tunnel {} removed from bridge {} and deleted",
            target.interface_name(),
            target.bridge_name
        );
        Ok(report)
    }

    /// Raw detailed listing of all tunnel links of one kind
    pub async fn list_tunnels(&self, tunnel_type: TunnelType) -> TunnelResult<String> {
        let mut report = self
            .run_sequence(
                Action::List,
                vec![self.commands.list_invocation(tunnel_type)],
            )
            .await?;

        Ok(report
            .steps
            .pop()
            .map(|step| step.output)
            .unwrap_or_default())
    }

    /// Check that the tunnel link exists and the remote endpoint answers
    pub async fn validate_tunnel(&self, probe: &ProbeParams) -> TunnelResult<ActionReport> {
        let report = self
            .run_sequence(Action::Validate, self.commands.validate_sequence(probe))
            .await?;

        info!(
            "Connectivity to {} VNI {} at {} from {} is successful",
            probe.tunnel_type.kind().to_uppercase(),
            probe.vni,
            probe.dst_host,
            probe.src_host
        );
        Ok(report)
    }

    async fn run_sequence(
        &self,
        action: Action,
        steps: Vec<Invocation>,
    ) -> TunnelResult<ActionReport> {
        let total = steps.len();
        let mut outputs = Vec::with_capacity(total);

        for (idx, invocation) in steps.iter().enumerate() {
            let step = idx + 1;
            debug!(%action, step, total, command = %invocation, "Running step");

            match exec::exec_checked(&self.executor, invocation).await {
                Ok(result) => outputs.push(StepOutput {
                    command: invocation.to_string(),
                    output: result.combined_output(),
                }),
                Err(e) => {
                    warn!("{} step {}/{} failed: {}", action, step, total, e);
                    return Err(TunnelError::step_failed(action.as_str(), step, total, e));
                }
            }
        }

        Ok(ActionReport {
            action,
            steps: outputs,
        })
    }
}
