use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, instrument, warn};

use chatter_adapter::{
    Adapter, AdapterConfig, AdapterError, AgentKind, CancelHandle, FinishReason, ProcessAdapter,
    TurnRequest,
};
use chatter_context::{assemble, get_context_for_route, AgentFamily, ContextOptions, MessageLog};
use chatter_markers::{
    parse_markers, resolve_addressees, resolve_names_to_member_ids, DropDirective,
};
use chatter_config::CoordinatorConfig;
use chatter_queue::{EnqueueTarget, RoutingQueue};
use chatter_types::{
    ConversationMessage, Intent, Member, MemberType, RoutingInfo, RoutingItem, Snapshot, Speaker,
    Team,
};

use crate::error::CoordinatorError;
use crate::events::Event;

/// Session lifecycle (§4.6.1). `Paused` carries the member the session is
/// waiting on; only a matching `inject_message` call may resume from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Running,
    Paused { waiting_for_member_id: String },
    Stopped,
    Completed,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Stopped | SessionStatus::Completed)
    }
}

/// Whether a just-processed message should continue draining the queue
/// or has already transitioned the session to a paused/terminal state.
enum ProcessOutcome {
    Continue,
    Terminated,
}

/// Result of one agent turn, used by the drain loop to decide whether the
/// resulting message should itself be routed (§4.6.3 step 5 vs. step 6).
enum TurnOutcome {
    Crashed,
    PartialNoRoute(ConversationMessage),
    Routed {
        message: ConversationMessage,
        outcome: ProcessOutcome,
    },
}

fn agent_kind_for(family: AgentFamily) -> AgentKind {
    match family {
        AgentFamily::ClaudeCode => AgentKind::ClaudeCode,
        AgentFamily::OpenAiCodex => AgentKind::Codex,
        AgentFamily::GoogleGemini => AgentKind::Gemini,
        AgentFamily::Fallback => AgentKind::PlainText,
    }
}

fn speaker_for(member: &Member) -> Speaker {
    Speaker {
        id: member.id.clone(),
        name: member.name.clone(),
        display_name: member.display_name.clone(),
        member_type: member.member_type,
    }
}

/// The multi-party conversation orchestrator (C7). Owns the team
/// definition, the append-only message log, the routing queue, one lazily
/// constructed adapter per agent type, and any cancellation handle for a
/// turn currently in flight. Mutated exclusively by its own methods —
/// there is no internal locking, matching §5's single-coordinator-task
/// model.
pub struct Coordinator {
    team: Team,
    status: SessionStatus,
    log: MessageLog,
    queue: RoutingQueue,
    config: CoordinatorConfig,
    adapters: HashMap<String, Arc<dyn Adapter>>,
    cancel_handles: HashMap<String, CancelHandle>,
    events_tx: mpsc::UnboundedSender<Event>,
}

impl Coordinator {
    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    pub fn team(&self) -> &Team {
        &self.team
    }

    pub fn log(&self) -> &MessageLog {
        &self.log
    }

    /// Override the adapter used for `agent_type`, bypassing the lazily
    /// constructed [`ProcessAdapter`]. Intended for embedding
    /// applications or tests that substitute a scripted adapter.
    pub fn set_adapter(&mut self, agent_type: impl Into<String>, adapter: Arc<dyn Adapter>) {
        self.adapters.insert(agent_type.into(), adapter);
    }

    fn set_status(&mut self, status: SessionStatus) {
        self.status = status.clone();
        let _ = self.events_tx.send(Event::StatusChanged(status));
    }

    fn pause_on(&mut self, member_id: String) {
        self.set_status(SessionStatus::Paused {
            waiting_for_member_id: member_id,
        });
    }

    fn pause_on_first_human_or_complete(&mut self) {
        match self.team.first_human() {
            Some(human) => self.pause_on(human.id.clone()),
            None => self.set_status(SessionStatus::Completed),
        }
    }

    fn adapter_for(&mut self, agent_type: &str) -> Arc<dyn Adapter> {
        if let Some(adapter) = self.adapters.get(agent_type) {
            return adapter.clone();
        }
        let mut config = self.config.adapter_for(agent_type).cloned().unwrap_or_else(|| {
            warn!(agent_type, "no adapter config for agent type, using bare command fallback");
            AdapterConfig::new(agent_type)
        });
        config.max_timeout = self.config.max_timeout_for(agent_type);
        let kind = agent_kind_for(AgentFamily::resolve(agent_type));
        let adapter: Arc<dyn Adapter> = Arc::new(ProcessAdapter::new(kind, config));
        self.adapters.insert(agent_type.to_string(), adapter.clone());
        adapter
    }

    /// Admit one raw message (parse markers, apply team task, build
    /// `RoutingInfo`, append to the log) and, unless `route_markers` is
    /// false, drive the rest of §4.6.2 from it: DROP application,
    /// addressee resolution and its failure classification, and
    /// enqueueing. Returns whether the drain loop should continue or the
    /// session has already paused/completed.
    fn process_message(
        &mut self,
        raw_content: String,
        speaker: Speaker,
        parent_message_id: Option<String>,
        intent: Option<Intent>,
        route_markers: bool,
    ) -> Result<ProcessOutcome, CoordinatorError> {
        let parsed = parse_markers(&raw_content);

        if let Some(task) = &parsed.team_task {
            let (capped, _truncated) = self.log.set_team_task(task);
            let _ = self.events_tx.send(Event::TeamTaskChanged(Some(capped)));
        }

        let resolve = resolve_addressees(&self.team.members, &parsed.parsed_addressees);

        let drop_target_ids: Vec<String> = match &parsed.drop {
            DropDirective::All => vec!["ALL".to_string()],
            DropDirective::Named(names) => resolve_names_to_member_ids(&self.team.members, names),
            DropDirective::None => Vec::new(),
        };

        let routing_info = RoutingInfo {
            raw_next_markers: parsed.raw_next_markers.clone(),
            resolved_addressees: resolve.resolved.iter().map(|r| r.member.name.clone()).collect(),
            parsed_addressees: parsed.parsed_addressees.clone(),
            parent_message_id,
            intent,
            drop_targets: drop_target_ids.clone(),
        };

        let message = self
            .log
            .add_message(parsed.clean_content.clone(), speaker.clone(), Some(routing_info))?
            .clone();
        let _ = self.events_tx.send(Event::Message(message.clone()));

        if !route_markers {
            return Ok(ProcessOutcome::Continue);
        }

        match &parsed.drop {
            DropDirective::All => {
                self.queue.drop_all();
            }
            DropDirective::Named(_) => {
                if !drop_target_ids.is_empty() {
                    self.queue.drop_by_member_ids(&drop_target_ids);
                }
            }
            DropDirective::None => {}
        }

        let has_addressees = !parsed.parsed_addressees.is_empty();

        if resolve.is_total_failure() {
            let _ = self
                .events_tx
                .send(Event::UnresolvedAddressees(resolve.unresolved.clone()));
            if speaker.member_type == MemberType::Human {
                self.pause_on(speaker.id.clone());
            } else {
                self.pause_on_first_human_or_complete();
            }
            return Ok(ProcessOutcome::Terminated);
        }

        if resolve.is_partial_failure() {
            let _ = self
                .events_tx
                .send(Event::PartialResolveFailure(resolve.unresolved.clone()));
        }

        if !has_addressees {
            self.pause_on_first_human_or_complete();
            return Ok(ProcessOutcome::Terminated);
        }

        let targets: Vec<EnqueueTarget> = resolve
            .resolved
            .iter()
            .map(|r| EnqueueTarget {
                target_member_id: r.member.id.clone(),
                intent: r.intent,
            })
            .collect();
        let outcome = self.queue.enqueue(&message.id, &message.id, &targets);
        if outcome.changed() {
            let _ = self.events_tx.send(Event::QueueUpdate(self.queue.get_stats()));
        }
        for protection in outcome.protections {
            let _ = self.events_tx.send(Event::QueueProtection(protection));
        }

        Ok(ProcessOutcome::Continue)
    }

    /// §4.6.2 steps 6-8, flattened into a loop rather than the spec's
    /// recursive `routeToNext` call on each agent-produced message — wall
    /// clock and stack depth are the same either way, but a loop needs no
    /// boxed future for the self-recursive `async fn` case.
    #[instrument(skip(self), fields(status = ?self.status))]
    async fn drain_queue(&mut self) -> Result<(), CoordinatorError> {
        loop {
            if self.status.is_terminal() || matches!(self.status, SessionStatus::Paused { .. }) {
                return Ok(());
            }

            let Some(item) = self.queue.select_next() else {
                self.set_status(SessionStatus::Completed);
                return Ok(());
            };

            let Some(member) = self.team.member_by_id(&item.target_member_id).cloned() else {
                // Invalid member id: silently dropped per §4.7's table.
                warn!(target_member_id = %item.target_member_id, "routing item names unknown member, dropping");
                continue;
            };

            if member.is_human() {
                self.pause_on(member.id.clone());
                return Ok(());
            }

            match self.send_to_agent(&member, &item).await? {
                TurnOutcome::Crashed => continue,
                TurnOutcome::PartialNoRoute(message) => {
                    self.queue.mark_completed(message.id);
                    continue;
                }
                TurnOutcome::Routed { message, outcome } => {
                    self.queue.mark_completed(message.id);
                    if matches!(outcome, ProcessOutcome::Terminated) {
                        return Ok(());
                    }
                    continue;
                }
            }
        }
    }

    /// §4.6.3: run one turn on `member` for `route`, then fold the result
    /// back into the log and (for a successful completion) the routing
    /// pipeline.
    #[instrument(skip(self, route), fields(member_id = %member.id, agent_type = member.agent_type.as_deref().unwrap_or("")))]
    async fn send_to_agent(
        &mut self,
        member: &Member,
        route: &RoutingItem,
    ) -> Result<TurnOutcome, CoordinatorError> {
        let team_task = self.log.team_task().map(|s| s.to_string());
        let input = get_context_for_route(
            &self.log,
            route,
            team_task,
            ContextOptions {
                force_parent_reinsertion: true,
                ..ContextOptions::default()
            },
        );

        let agent_type = member.agent_type.clone().unwrap_or_default();
        let family = AgentFamily::resolve(&agent_type);
        let assembled = assemble(family, &input, self.config.max_bytes);

        let adapter = self.adapter_for(&agent_type);
        let env: HashMap<String, String> = self.config.proxy.env_vars().into_iter().collect();

        let request = TurnRequest {
            member_id: member.id.clone(),
            prepared_message: assembled.prompt,
            system_flag: assembled.system_flag,
            env,
            cwd: None,
        };

        let (cancel_handle, cancel_rx) = ProcessAdapter::new_cancel_handle();
        self.cancel_handles.insert(member.id.clone(), cancel_handle);

        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let result = adapter.run_turn(request, events_tx, cancel_rx).await;
        self.cancel_handles.remove(&member.id);

        while let Some(event) = events_rx.recv().await {
            let _ = self.events_tx.send(Event::AgentEvent {
                member_id: member.id.clone(),
                event,
            });
        }

        let turn = match result {
            Ok(turn) => turn,
            Err(err) => {
                let code = match &err {
                    AdapterError::AgentSpawnError(_) => "agent_spawn_error",
                    AdapterError::AgentExitError { .. } => "agent_exit_error",
                    AdapterError::AgentTimeout => "agent_timeout",
                    AdapterError::AgentCancelled => "agent_cancelled",
                    AdapterError::DecodeError(_) => "agent_decode_error",
                };
                let _ = self.events_tx.send(Event::AgentEvent {
                    member_id: member.id.clone(),
                    event: chatter_adapter::AgentEvent::Error {
                        code: code.to_string(),
                        message: err.to_string(),
                    },
                });
                return Ok(TurnOutcome::Crashed);
            }
        };

        if turn.finish_reason == FinishReason::Error {
            let _ = self.events_tx.send(Event::AgentEvent {
                member_id: member.id.clone(),
                event: chatter_adapter::AgentEvent::Error {
                    code: "agent_exit_error".to_string(),
                    message: "agent process exited before completing the turn".to_string(),
                },
            });
            return Ok(TurnOutcome::Crashed);
        }

        let speaker = speaker_for(member);

        if matches!(turn.finish_reason, FinishReason::Cancelled | FinishReason::Timeout) {
            let content = if turn.accumulated_text.is_empty() {
                "[no response]".to_string()
            } else {
                turn.accumulated_text
            };
            self.process_message(
                content,
                speaker,
                Some(route.parent_message_id.clone()),
                Some(route.intent),
                false,
            )?;
            let message = self.log.latest().expect("just added").clone();
            return Ok(TurnOutcome::PartialNoRoute(message));
        }

        let outcome = self.process_message(
            turn.accumulated_text,
            speaker,
            Some(route.parent_message_id.clone()),
            Some(route.intent),
            true,
        )?;
        let message = self.log.latest().expect("just added").clone();
        Ok(TurnOutcome::Routed { message, outcome })
    }

    /// §6.1 `sendMessage`. Admits a speaker-originated message and drains
    /// the queue it produces.
    pub async fn send_message(
        &mut self,
        content: impl Into<String>,
        speaker_member_id: &str,
    ) -> Result<(), CoordinatorError> {
        if self.status.is_terminal() {
            return Err(CoordinatorError::InvalidState(
                "cannot send a message once the session is stopped or completed".to_string(),
            ));
        }
        let member = self
            .team
            .member_by_id(speaker_member_id)
            .ok_or_else(|| {
                CoordinatorError::InvalidState(format!("unknown member id: {speaker_member_id}"))
            })?
            .clone();
        let speaker = speaker_for(&member);

        if matches!(self.status, SessionStatus::Idle) {
            self.set_status(SessionStatus::Running);
        }

        let outcome = self.process_message(content.into(), speaker, None, None, true)?;
        if matches!(outcome, ProcessOutcome::Continue) {
            self.drain_queue().await?;
        }
        Ok(())
    }

    /// §4.6.4 `injectMessage`.
    pub async fn inject_message(
        &mut self,
        member_id: &str,
        content: impl Into<String>,
    ) -> Result<(), CoordinatorError> {
        match &self.status {
            SessionStatus::Paused { waiting_for_member_id } if waiting_for_member_id == member_id => {}
            _ => {
                return Err(CoordinatorError::InvalidState(format!(
                    "not paused waiting on {member_id}"
                )))
            }
        }
        let member = self
            .team
            .member_by_id(member_id)
            .ok_or_else(|| CoordinatorError::InvalidState(format!("unknown member id: {member_id}")))?
            .clone();
        let speaker = speaker_for(&member);

        self.set_status(SessionStatus::Running);
        let outcome = self.process_message(content.into(), speaker, None, None, true)?;
        if matches!(outcome, ProcessOutcome::Continue) {
            self.drain_queue().await?;
        }
        Ok(())
    }

    /// §5 cancellation: terminal from any state, idempotent, cancels any
    /// in-flight turn and clears the queue.
    pub fn stop(&mut self) {
        if matches!(self.status, SessionStatus::Stopped) {
            return;
        }
        self.queue.clear();
        for (_, handle) in self.cancel_handles.drain() {
            handle.cancel();
        }
        debug!("coordinator stopped");
        self.set_status(SessionStatus::Stopped);
    }

    pub fn export_snapshot(&self) -> Snapshot {
        self.log.export_snapshot()
    }

    pub fn import_snapshot(&mut self, snapshot: Snapshot) -> Result<(), CoordinatorError> {
        self.log.import_snapshot(snapshot)?;
        Ok(())
    }
}

/// §6.1 `createCoordinator`. Pure constructor: validates `team`, then
/// builds an idle session. `events_tx` is the single event stream
/// replacing the spec's named callbacks (§4.6.5, §9).
pub fn create_coordinator(
    team: Team,
    config: CoordinatorConfig,
    events_tx: mpsc::UnboundedSender<Event>,
) -> Result<Coordinator, CoordinatorError> {
    team.validate()?;
    Ok(Coordinator {
        queue: RoutingQueue::new(config.queue.clone()),
        team,
        status: SessionStatus::Idle,
        log: MessageLog::new(),
        config,
        adapters: HashMap::new(),
        cancel_handles: HashMap::new(),
        events_tx,
    })
}
