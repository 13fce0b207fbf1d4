//! Conversation controller: the state machine that sequences query
//! stages, user re-prompts, and mapping lookups.
//!
//! The controller is driven one console line at a time and owns the
//! turn-scoped state: an explicit [`ControllerState`] describing which
//! prompt is outstanding, and `pending_input`, the current logical
//! turn's text. Augmentations (a chosen travel mode, a confirmed nearby
//! place) are appended to `pending_input` and the pipeline reruns on the
//! augmented text without consuming a new logical turn.

use tracing::{debug, warn};

use wayfare_core::config::ChatConfig;
use wayfare_core::{NearbyPlace, TravelInfo, TravelMode};
use wayfare_llm::CompletionClient;
use wayfare_maps::{find_nearest, travel_duration, MapsProvider};

use crate::history::ConversationLog;
use crate::stages::{Classification, QueryStages};

/// Fixed farewell printed when the user types `exit`.
pub const FAREWELL: &str = "Goodbye! Have a great day!";

/// Fixed sentence for queries the routing backend cannot answer.
pub const NO_ROUTE: &str = "no route was found from origin to destination";

const EXAMPLE_HINT: &str =
    "For example: 'How long does it take to drive from New York to Boston?'";
const MORE_SPECIFIC: &str = "I see. Could you please provide a more specific destination?";
const TROUBLE: &str =
    "I had trouble understanding that. Could you please rephrase your question?";

/// Which prompt, if any, is outstanding.
#[derive(Clone, Debug, PartialEq)]
pub enum ControllerState {
    /// The next line starts a fresh query.
    Idle,
    /// The numbered travel-mode menu is outstanding.
    AwaitingModeChoice { destination: Option<String> },
    /// A yes/no question about a nearby match is outstanding.
    AwaitingPlaceConfirmation { place: NearbyPlace },
    /// The exit command was seen; nothing further runs.
    Terminated,
}

/// The controller's answer to one console line.
#[derive(Clone, Debug, PartialEq)]
pub struct Reply {
    /// Messages to print, in order.
    pub messages: Vec<String>,
    /// Whether the session is over.
    pub session_over: bool,
}

impl Reply {
    fn say(message: impl Into<String>) -> Self {
        Self {
            messages: vec![message.into()],
            session_over: false,
        }
    }

    fn say_many(messages: Vec<String>) -> Self {
        Self {
            messages,
            session_over: false,
        }
    }

    fn farewell() -> Self {
        Self {
            messages: vec![FAREWELL.to_string()],
            session_over: true,
        }
    }
}

/// The conversation controller.
pub struct Controller<C, P> {
    stages: QueryStages<C>,
    maps: P,
    log: ConversationLog,
    context_turns: usize,
    state: ControllerState,
    /// The current logical turn's text, kept across augmentations.
    pending_input: Option<String>,
}

impl<C: CompletionClient, P: MapsProvider> Controller<C, P> {
    /// Build a controller over a completion client and maps provider.
    pub fn new(llm: C, maps: P, config: &ChatConfig) -> Self {
        Self {
            stages: QueryStages::new(llm),
            maps,
            log: ConversationLog::new(config.max_history_turns),
            context_turns: config.context_turns,
            state: ControllerState::Idle,
            pending_input: None,
        }
    }

    /// The number of completed exchanges so far.
    pub fn history_len(&self) -> usize {
        self.log.len()
    }

    /// Process one console line and produce the assistant's reply.
    ///
    /// Never fails: stage and backend errors are converted into
    /// conversational re-prompts per the recovery policy.
    pub async fn handle_line(&mut self, line: &str) -> Reply {
        let line = line.trim();

        // The exit command wins from every state, before any stage runs.
        if line.eq_ignore_ascii_case("exit") {
            self.state = ControllerState::Terminated;
            self.pending_input = None;
            return Reply::farewell();
        }

        match std::mem::replace(&mut self.state, ControllerState::Idle) {
            ControllerState::Terminated => {
                self.state = ControllerState::Terminated;
                Reply {
                    messages: vec![],
                    session_over: true,
                }
            }

            ControllerState::Idle => {
                self.pending_input = Some(line.to_string());
                self.process_pending().await
            }

            ControllerState::AwaitingModeChoice { destination } => {
                match TravelMode::from_menu_choice(line) {
                    Some(mode) => {
                        if let Some(pending) = self.pending_input.as_mut() {
                            pending.push_str(" travel mode: ");
                            pending.push_str(mode.as_str());
                        }
                        debug!(mode = %mode, "Travel mode chosen from menu");
                        self.process_pending().await
                    }
                    None => {
                        // Loop on the menu until a valid number arrives.
                        let menu = mode_menu(destination.as_deref());
                        self.state = ControllerState::AwaitingModeChoice { destination };
                        Reply::say(menu)
                    }
                }
            }

            ControllerState::AwaitingPlaceConfirmation { place } => {
                if line.eq_ignore_ascii_case("yes") {
                    if let Some(pending) = self.pending_input.as_mut() {
                        pending.push(' ');
                        pending.push_str(&place.name);
                        pending.push_str(" at ");
                        pending.push_str(&place.address);
                    }
                    debug!(place = %place.name, "Nearby match confirmed");
                    self.process_pending().await
                } else {
                    self.pending_input = None;
                    Reply::say(MORE_SPECIFIC)
                }
            }
        }
    }

    /// Run the query pipeline over the pending input.
    ///
    /// One pass: validate, classify, then branch into the mode menu, the
    /// nearby-place flow, or the duration pipeline. Augmentation paths
    /// re-enter here from `handle_line` with the same logical turn.
    async fn process_pending(&mut self) -> Reply {
        let input = match self.pending_input.clone() {
            Some(input) => input,
            None => return Reply::say(TROUBLE),
        };

        let validation = match self.stages.validate(&input).await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "Validator stage failed");
                self.pending_input = None;
                return Reply::say(TROUBLE);
            }
        };

        if !validation.is_valid {
            self.pending_input = None;
            let reason = validation.reason.trim().trim_end_matches('.');
            let reason = if reason.is_empty() {
                "That doesn't look like a travel duration question"
            } else {
                reason
            };
            return Reply::say_many(vec![
                format!("{reason}. Could you please rephrase your question?"),
                EXAMPLE_HINT.to_string(),
            ]);
        }

        // Classification runs only after successful validation; its
        // confidence is informational, never a branching input.
        let destination = validation.destination.clone().unwrap_or_default();
        let classification = match self.stages.classify(&destination).await {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Classifier stage failed");
                self.pending_input = None;
                return Reply::say(TROUBLE);
            }
        };
        debug!(
            destination = %destination,
            classification = ?classification.classification,
            confidence = classification.confidence,
            "Destination classified"
        );

        if !validation.has_mode {
            let destination = validation.destination.clone();
            let menu = mode_menu(destination.as_deref());
            self.state = ControllerState::AwaitingModeChoice { destination };
            return Reply::say(menu);
        }

        if classification.classification == Classification::General {
            let origin = validation.origin.clone().unwrap_or_default();
            return match find_nearest(&self.maps, &origin, &destination).await {
                Some(place) => {
                    let question = format!(
                        "Did you mean to go to the nearest {} at {}? (yes/no)",
                        place.name, place.address
                    );
                    self.state = ControllerState::AwaitingPlaceConfirmation { place };
                    Reply::say(question)
                }
                None => {
                    self.pending_input = None;
                    Reply::say(format!(
                        "I couldn't find a nearby {destination}. \
                         Could you please provide a more specific destination?"
                    ))
                }
            };
        }

        // Valid, mode present, specific destination: fetch the duration
        // and compose the answer.
        let extracted = match self.stages.extract(&input).await {
            Ok(x) => x,
            Err(e) => {
                warn!(error = %e, "Extractor stage failed");
                self.pending_input = None;
                return Reply::say(TROUBLE);
            }
        };

        let (duration, eta) = travel_duration(
            &self.maps,
            &extracted.origin,
            &extracted.destination,
            extracted.mode,
        )
        .await;

        let info = TravelInfo {
            origin: extracted.origin,
            destination: extracted.destination,
            mode: extracted.mode,
            duration,
            eta,
        };

        // The no-route sentence is guaranteed here, not delegated to the
        // model.
        let answer = if !info.has_route() {
            NO_ROUTE.to_string()
        } else {
            let history = self.log.render_recent(self.context_turns);
            match self.stages.compose(&info.summary(), &history).await {
                Ok(text) => text,
                Err(e) => {
                    warn!(error = %e, "Composer stage failed, using plain summary");
                    format!(
                        "Travel duration from {} to {} by {}: {} (arriving around {}).",
                        info.origin,
                        info.destination,
                        info.mode,
                        info.duration.as_deref().unwrap_or("unknown"),
                        info.eta.as_deref().unwrap_or("unknown"),
                    )
                }
            }
        };

        self.log.push(input, answer.clone());
        self.pending_input = None;
        Reply::say(answer)
    }
}

fn mode_menu(destination: Option<&str>) -> String {
    format!(
        "How do you want to get to {}?\n\
         Please enter one of the numbers: 1 driving; 2 walking; 3 bicycling; 4 transit",
        destination.unwrap_or("your destination")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use wayfare_core::Coordinates;
    use wayfare_llm::LlmError;
    use wayfare_maps::{MapsError, RouteDuration};

    // =====================================================================
    // Scripted completion client
    // =====================================================================

    #[derive(Default)]
    struct StageCounts {
        validate: AtomicUsize,
        classify: AtomicUsize,
        extract: AtomicUsize,
        compose: AtomicUsize,
    }

    type StageFn = Box<dyn Fn(&str) -> String + Send + Sync>;

    /// Routes each prompt to a per-stage closure by template marker and
    /// counts calls per stage.
    struct ScriptedLlm {
        counts: Arc<StageCounts>,
        on_validate: StageFn,
        on_classify: StageFn,
        on_extract: StageFn,
        on_compose: StageFn,
    }

    impl ScriptedLlm {
        fn new() -> Self {
            Self {
                counts: Arc::new(StageCounts::default()),
                on_validate: Box::new(|_| valid_json("New York", "Boston", true)),
                on_classify: Box::new(|_| class_json("specific", 0.9)),
                on_extract: Box::new(|_| extract_json("New York", "Boston", "driving")),
                on_compose: Box::new(|_| "It takes 3 hours 45 mins to drive there.".to_string()),
            }
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedLlm {
        async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
            if prompt.contains("Validate whether the following input") {
                self.counts.validate.fetch_add(1, Ordering::SeqCst);
                Ok((self.on_validate)(prompt))
            } else if prompt.contains("Classify the following destination") {
                self.counts.classify.fetch_add(1, Ordering::SeqCst);
                Ok((self.on_classify)(prompt))
            } else if prompt.contains("Extract the full origin") {
                self.counts.extract.fetch_add(1, Ordering::SeqCst);
                Ok((self.on_extract)(prompt))
            } else if prompt.contains("Based on the following travel information") {
                self.counts.compose.fetch_add(1, Ordering::SeqCst);
                Ok((self.on_compose)(prompt))
            } else {
                panic!("unexpected prompt: {prompt}");
            }
        }
    }

    fn valid_json(origin: &str, destination: &str, has_mode: bool) -> String {
        format!(
            r#"{{"is_valid": true, "reason": "", "origin": "{origin}",
                "destination": "{destination}", "has_mode": {has_mode}}}"#
        )
    }

    fn invalid_json(reason: &str) -> String {
        format!(
            r#"{{"is_valid": false, "reason": "{reason}", "origin": null,
                "destination": null, "has_mode": false}}"#
        )
    }

    fn class_json(label: &str, confidence: f32) -> String {
        format!(
            r#"{{"classification": "{label}", "confidence": {confidence}, "reason": "test"}}"#
        )
    }

    fn extract_json(origin: &str, destination: &str, mode: &str) -> String {
        format!(r#"{{"origin": "{origin}", "destination": "{destination}", "mode": "{mode}"}}"#)
    }

    // =====================================================================
    // Scripted maps provider
    // =====================================================================

    struct FakeMaps {
        geocode_calls: AtomicUsize,
        search_calls: AtomicUsize,
        route_calls: AtomicUsize,
        geocode_ok: bool,
        place: Option<NearbyPlace>,
        route: Option<RouteDuration>,
    }

    impl FakeMaps {
        fn with_route() -> Self {
            Self {
                geocode_calls: AtomicUsize::new(0),
                search_calls: AtomicUsize::new(0),
                route_calls: AtomicUsize::new(0),
                geocode_ok: true,
                place: Some(walgreens()),
                route: Some(RouteDuration {
                    text: "3 hours 45 mins".to_string(),
                    seconds: 13500,
                }),
            }
        }

        fn without_route() -> Self {
            Self {
                route: None,
                ..Self::with_route()
            }
        }

        fn geocode_failing() -> Self {
            Self {
                geocode_ok: false,
                ..Self::with_route()
            }
        }
    }

    fn walgreens() -> NearbyPlace {
        NearbyPlace {
            name: "Walgreens".to_string(),
            address: "300 Montgomery St".to_string(),
            location: Coordinates {
                lat: 37.792,
                lng: -122.402,
            },
        }
    }

    #[async_trait]
    impl MapsProvider for FakeMaps {
        async fn geocode(&self, _address: &str) -> Result<Coordinates, MapsError> {
            self.geocode_calls.fetch_add(1, Ordering::SeqCst);
            if self.geocode_ok {
                Ok(Coordinates {
                    lat: 37.7936,
                    lng: -122.3965,
                })
            } else {
                Err(MapsError::ProviderStatus {
                    endpoint: "geocode",
                    status: "ZERO_RESULTS".to_string(),
                })
            }
        }

        async fn nearby_search(
            &self,
            _location: Coordinates,
            _keyword: &str,
        ) -> Result<Option<NearbyPlace>, MapsError> {
            self.search_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.place.clone())
        }

        async fn route_duration(
            &self,
            _origin: &str,
            _destination: &str,
            _mode: TravelMode,
        ) -> Result<RouteDuration, MapsError> {
            self.route_calls.fetch_add(1, Ordering::SeqCst);
            self.route.clone().ok_or(MapsError::NoResults {
                endpoint: "directions",
            })
        }
    }

    fn controller(
        llm: ScriptedLlm,
        maps: FakeMaps,
    ) -> (Controller<ScriptedLlm, FakeMaps>, Arc<StageCounts>) {
        let counts = Arc::clone(&llm.counts);
        (Controller::new(llm, maps, &ChatConfig::default()), counts)
    }

    // =====================================================================
    // Exit command
    // =====================================================================

    #[tokio::test]
    async fn exit_terminates_immediately_with_farewell() {
        let (mut ctrl, counts) = controller(ScriptedLlm::new(), FakeMaps::with_route());
        let reply = ctrl.handle_line("exit").await;
        assert!(reply.session_over);
        assert_eq!(reply.messages, vec![FAREWELL.to_string()]);
        assert_eq!(ctrl.state, ControllerState::Terminated);
        // No stage ran.
        assert_eq!(counts.validate.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn exit_is_case_insensitive_and_trimmed() {
        let (mut ctrl, _) = controller(ScriptedLlm::new(), FakeMaps::with_route());
        let reply = ctrl.handle_line("  EXIT  ").await;
        assert!(reply.session_over);
    }

    #[tokio::test]
    async fn exit_works_from_mode_menu() {
        let mut llm = ScriptedLlm::new();
        llm.on_validate = Box::new(|_| valid_json("New York", "Boston", false));
        let (mut ctrl, counts) = controller(llm, FakeMaps::with_route());

        ctrl.handle_line("How long from New York to Boston?").await;
        assert!(matches!(ctrl.state, ControllerState::AwaitingModeChoice { .. }));

        let validates_before = counts.validate.load(Ordering::SeqCst);
        let reply = ctrl.handle_line("exit").await;
        assert!(reply.session_over);
        assert_eq!(reply.messages, vec![FAREWELL.to_string()]);
        // No further stage ran on the exit line.
        assert_eq!(counts.validate.load(Ordering::SeqCst), validates_before);
    }

    #[tokio::test]
    async fn lines_after_termination_are_ignored() {
        let (mut ctrl, counts) = controller(ScriptedLlm::new(), FakeMaps::with_route());
        ctrl.handle_line("exit").await;
        let reply = ctrl.handle_line("How long from A to B?").await;
        assert!(reply.session_over);
        assert!(reply.messages.is_empty());
        assert_eq!(counts.validate.load(Ordering::SeqCst), 0);
    }

    // =====================================================================
    // Happy path
    // =====================================================================

    #[tokio::test]
    async fn specific_destination_with_mode_answers_in_one_turn() {
        let (mut ctrl, counts) = controller(ScriptedLlm::new(), FakeMaps::with_route());

        let reply = ctrl
            .handle_line("How long to drive from New York to Boston?")
            .await;

        assert!(!reply.session_over);
        assert_eq!(
            reply.messages,
            vec!["It takes 3 hours 45 mins to drive there.".to_string()]
        );
        assert_eq!(ctrl.state, ControllerState::Idle);
        assert_eq!(ctrl.history_len(), 1);

        // Exactly one pass through each stage, no disambiguation.
        assert_eq!(counts.validate.load(Ordering::SeqCst), 1);
        assert_eq!(counts.classify.load(Ordering::SeqCst), 1);
        assert_eq!(counts.extract.load(Ordering::SeqCst), 1);
        assert_eq!(counts.compose.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn happy_path_issues_no_disambiguation_calls() {
        let (mut ctrl, _) = controller(ScriptedLlm::new(), FakeMaps::with_route());
        ctrl.handle_line("How long to drive from New York to Boston?")
            .await;
        assert_eq!(ctrl.maps.geocode_calls.load(Ordering::SeqCst), 0);
        assert_eq!(ctrl.maps.search_calls.load(Ordering::SeqCst), 0);
        assert_eq!(ctrl.maps.route_calls.load(Ordering::SeqCst), 1);
    }

    // =====================================================================
    // Invalid input
    // =====================================================================

    #[tokio::test]
    async fn invalid_input_prompts_rephrase_with_example() {
        let mut llm = ScriptedLlm::new();
        llm.on_validate = Box::new(|_| invalid_json("There is no destination in the question"));
        let (mut ctrl, counts) = controller(llm, FakeMaps::with_route());

        let reply = ctrl.handle_line("hello there").await;
        assert_eq!(reply.messages.len(), 2);
        assert_eq!(
            reply.messages[0],
            "There is no destination in the question. Could you please rephrase your question?"
        );
        assert!(reply.messages[1].contains("For example"));
        assert_eq!(ctrl.state, ControllerState::Idle);
        assert_eq!(ctrl.pending_input, None);

        // The classifier is skipped for invalid input.
        assert_eq!(counts.classify.load(Ordering::SeqCst), 0);
        assert_eq!(counts.extract.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn invalid_input_with_empty_reason_uses_fallback() {
        let mut llm = ScriptedLlm::new();
        llm.on_validate = Box::new(|_| invalid_json(""));
        let (mut ctrl, _) = controller(llm, FakeMaps::with_route());

        let reply = ctrl.handle_line("???").await;
        assert!(reply.messages[0].starts_with("That doesn't look like a travel duration question"));
    }

    // =====================================================================
    // Mode menu
    // =====================================================================

    /// Validator that reports a missing mode until the menu augmentation
    /// appears in the prompt.
    fn mode_aware_validate() -> StageFn {
        Box::new(|prompt| {
            let has_mode = prompt.contains("travel mode:");
            valid_json("New York", "Boston", has_mode)
        })
    }

    #[tokio::test]
    async fn missing_mode_presents_numbered_menu() {
        let mut llm = ScriptedLlm::new();
        llm.on_validate = mode_aware_validate();
        let (mut ctrl, _) = controller(llm, FakeMaps::with_route());

        let reply = ctrl.handle_line("How long from New York to Boston?").await;
        assert_eq!(reply.messages.len(), 1);
        assert!(reply.messages[0].contains("How do you want to get to Boston?"));
        assert!(reply.messages[0].contains("1 driving; 2 walking; 3 bicycling; 4 transit"));
        assert_eq!(
            ctrl.state,
            ControllerState::AwaitingModeChoice {
                destination: Some("Boston".to_string())
            }
        );
        // Pending input survives for the augmentation.
        assert_eq!(
            ctrl.pending_input.as_deref(),
            Some("How long from New York to Boston?")
        );
    }

    #[tokio::test]
    async fn malformed_menu_replies_loop_until_valid() {
        let mut llm = ScriptedLlm::new();
        llm.on_validate = mode_aware_validate();
        let (mut ctrl, counts) = controller(llm, FakeMaps::with_route());

        ctrl.handle_line("How long from New York to Boston?").await;

        for bad in ["7", "driving", "one", ""] {
            let reply = ctrl.handle_line(bad).await;
            assert!(
                reply.messages[0].contains("Please enter one of the numbers"),
                "expected menu re-prompt for {bad:?}"
            );
            assert!(matches!(
                ctrl.state,
                ControllerState::AwaitingModeChoice { .. }
            ));
        }

        // Menu looping does not re-run the validator.
        assert_eq!(counts.validate.load(Ordering::SeqCst), 1);

        let reply = ctrl.handle_line("2").await;
        assert_eq!(
            reply.messages,
            vec!["It takes 3 hours 45 mins to drive there.".to_string()]
        );
        assert_eq!(ctrl.state, ControllerState::Idle);
        // The augmented text reran validation without a new logical turn.
        assert_eq!(counts.validate.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn chosen_mode_is_appended_to_pending_input() {
        let mut llm = ScriptedLlm::new();
        llm.on_validate = mode_aware_validate();
        let augmented = Arc::new(std::sync::Mutex::new(String::new()));
        let augmented_clone = Arc::clone(&augmented);
        llm.on_extract = Box::new(move |prompt| {
            // Capture the query text the extractor sees.
            *augmented_clone.lock().unwrap() = prompt.to_string();
            extract_json("New York", "Boston", "bicycling")
        });
        let (mut ctrl, _) = controller(llm, FakeMaps::with_route());

        ctrl.handle_line("How long from New York to Boston?").await;
        ctrl.handle_line("3").await;

        let prompt = augmented.lock().unwrap().clone();
        assert!(prompt.contains("How long from New York to Boston? travel mode: bicycling"));
        // The stored exchange carries the augmented turn text.
        assert_eq!(ctrl.history_len(), 1);
    }

    // =====================================================================
    // General destination / nearby-place flow
    // =====================================================================

    /// Classifier that calls the bare keyword general and anything
    /// carrying a street address specific.
    fn address_aware_classify() -> StageFn {
        Box::new(|prompt| {
            if prompt.contains("Montgomery St") {
                class_json("specific", 0.95)
            } else {
                class_json("general", 0.85)
            }
        })
    }

    /// Validator for the Walgreens scenario: destination follows the
    /// augmentation when present.
    fn walgreens_validate() -> StageFn {
        Box::new(|prompt| {
            if prompt.contains("Walgreens at 300 Montgomery St") {
                valid_json("my office at 1 Market St", "Walgreens at 300 Montgomery St", true)
            } else {
                valid_json("my office at 1 Market St", "Walgreens", true)
            }
        })
    }

    #[tokio::test]
    async fn general_destination_asks_to_confirm_nearest_match() {
        let mut llm = ScriptedLlm::new();
        llm.on_validate = walgreens_validate();
        llm.on_classify = address_aware_classify();
        let (mut ctrl, _) = controller(llm, FakeMaps::with_route());

        let reply = ctrl
            .handle_line("How do I get to Walgreens from my office at 1 Market St? driving")
            .await;

        assert_eq!(
            reply.messages,
            vec![
                "Did you mean to go to the nearest Walgreens at 300 Montgomery St? (yes/no)"
                    .to_string()
            ]
        );
        assert!(matches!(
            ctrl.state,
            ControllerState::AwaitingPlaceConfirmation { .. }
        ));

        // Exactly one geocode and one nearby-search call.
        assert_eq!(ctrl.maps.geocode_calls.load(Ordering::SeqCst), 1);
        assert_eq!(ctrl.maps.search_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn confirming_match_augments_and_reprocesses_same_turn() {
        let mut llm = ScriptedLlm::new();
        llm.on_validate = walgreens_validate();
        llm.on_classify = address_aware_classify();
        llm.on_extract = Box::new(|_| {
            extract_json("my office at 1 Market St", "Walgreens at 300 Montgomery St", "driving")
        });
        let (mut ctrl, counts) = controller(llm, FakeMaps::with_route());

        ctrl.handle_line("How do I get to Walgreens from my office at 1 Market St? driving")
            .await;
        let reply = ctrl.handle_line("yes").await;

        assert_eq!(
            reply.messages,
            vec!["It takes 3 hours 45 mins to drive there.".to_string()]
        );
        assert_eq!(ctrl.state, ControllerState::Idle);
        // Validation ran twice: original turn, then augmented rerun.
        assert_eq!(counts.validate.load(Ordering::SeqCst), 2);
        // No second disambiguation round.
        assert_eq!(ctrl.maps.geocode_calls.load(Ordering::SeqCst), 1);
        assert_eq!(ctrl.maps.search_calls.load(Ordering::SeqCst), 1);
        assert_eq!(ctrl.history_len(), 1);
    }

    #[tokio::test]
    async fn declining_match_asks_for_more_specific_destination() {
        let mut llm = ScriptedLlm::new();
        llm.on_validate = walgreens_validate();
        llm.on_classify = address_aware_classify();
        let (mut ctrl, counts) = controller(llm, FakeMaps::with_route());

        ctrl.handle_line("How do I get to Walgreens from my office at 1 Market St? driving")
            .await;
        let reply = ctrl.handle_line("no").await;

        assert_eq!(reply.messages, vec![MORE_SPECIFIC.to_string()]);
        assert_eq!(ctrl.state, ControllerState::Idle);
        assert_eq!(ctrl.pending_input, None);
        // Declining does not rerun any stage.
        assert_eq!(counts.validate.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn nearby_lookup_failure_asks_for_more_specific_destination() {
        let mut llm = ScriptedLlm::new();
        llm.on_validate = walgreens_validate();
        llm.on_classify = address_aware_classify();
        let (mut ctrl, _) = controller(llm, FakeMaps::geocode_failing());

        let reply = ctrl
            .handle_line("How do I get to Walgreens from my office at 1 Market St? driving")
            .await;

        assert_eq!(reply.messages.len(), 1);
        assert!(reply.messages[0].contains("I couldn't find a nearby Walgreens"));
        assert_eq!(ctrl.state, ControllerState::Idle);
        // Geocode failed, so the search was never issued.
        assert_eq!(ctrl.maps.geocode_calls.load(Ordering::SeqCst), 1);
        assert_eq!(ctrl.maps.search_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_nearby_result_asks_for_more_specific_destination() {
        let mut llm = ScriptedLlm::new();
        llm.on_validate = walgreens_validate();
        llm.on_classify = address_aware_classify();
        let maps = FakeMaps {
            place: None,
            ..FakeMaps::with_route()
        };
        let (mut ctrl, _) = controller(llm, maps);

        let reply = ctrl
            .handle_line("How do I get to Walgreens from my office at 1 Market St? driving")
            .await;
        assert!(reply.messages[0].contains("I couldn't find a nearby Walgreens"));
    }

    // =====================================================================
    // No route
    // =====================================================================

    #[tokio::test]
    async fn routing_failure_yields_exact_no_route_sentence() {
        let (mut ctrl, counts) = controller(ScriptedLlm::new(), FakeMaps::without_route());

        let reply = ctrl
            .handle_line("How long to drive from New York to Boston?")
            .await;

        assert_eq!(reply.messages, vec![NO_ROUTE.to_string()]);
        // The fixed sentence is produced without consulting the model.
        assert_eq!(counts.compose.load(Ordering::SeqCst), 0);
        // The failed turn is still remembered.
        assert_eq!(ctrl.history_len(), 1);
    }

    // =====================================================================
    // Malformed completions
    // =====================================================================

    #[tokio::test]
    async fn malformed_validator_completion_prompts_rephrase() {
        let mut llm = ScriptedLlm::new();
        llm.on_validate = Box::new(|_| "Sorry, no JSON for you today.".to_string());
        let (mut ctrl, _) = controller(llm, FakeMaps::with_route());

        let reply = ctrl.handle_line("How long from A to B? driving").await;
        assert_eq!(reply.messages, vec![TROUBLE.to_string()]);
        assert_eq!(ctrl.state, ControllerState::Idle);
        assert_eq!(ctrl.pending_input, None);
    }

    #[tokio::test]
    async fn malformed_extractor_completion_prompts_rephrase() {
        let mut llm = ScriptedLlm::new();
        llm.on_extract = Box::new(|_| extract_json("A", "B", "hovercraft"));
        let (mut ctrl, _) = controller(llm, FakeMaps::with_route());

        let reply = ctrl
            .handle_line("How long to drive from New York to Boston?")
            .await;
        assert_eq!(reply.messages, vec![TROUBLE.to_string()]);
        assert_eq!(ctrl.state, ControllerState::Idle);
    }

    // =====================================================================
    // Composer fallback and history
    // =====================================================================

    #[tokio::test]
    async fn composer_failure_falls_back_to_plain_summary() {
        // ScriptedLlm closures cannot fail, so wrap it with a client
        // that errors on the composer prompt only.
        struct ComposeFails(ScriptedLlm);

        #[async_trait]
        impl CompletionClient for ComposeFails {
            async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
                if prompt.contains("Based on the following travel information") {
                    Err(LlmError::EmptyCompletion)
                } else {
                    self.0.complete(prompt).await
                }
            }
        }

        let maps = FakeMaps::with_route();
        let mut ctrl = Controller::new(
            ComposeFails(ScriptedLlm::new()),
            maps,
            &ChatConfig::default(),
        );

        let reply = ctrl
            .handle_line("How long to drive from New York to Boston?")
            .await;
        assert_eq!(reply.messages.len(), 1);
        assert!(reply.messages[0].contains("3 hours 45 mins"));
        assert!(reply.messages[0].contains("New York"));
    }

    #[tokio::test]
    async fn history_accumulates_across_turns() {
        let (mut ctrl, _) = controller(ScriptedLlm::new(), FakeMaps::with_route());
        ctrl.handle_line("How long to drive from New York to Boston?")
            .await;
        ctrl.handle_line("How long to drive from Boston to Salem?")
            .await;
        assert_eq!(ctrl.history_len(), 2);
    }

    #[tokio::test]
    async fn composer_prompt_carries_recent_history() {
        let mut llm = ScriptedLlm::new();
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        llm.on_compose = Box::new(move |prompt| {
            seen_clone.lock().unwrap().push(prompt.to_string());
            "Composed answer.".to_string()
        });
        let (mut ctrl, _) = controller(llm, FakeMaps::with_route());

        ctrl.handle_line("How long to drive from New York to Boston?")
            .await;
        ctrl.handle_line("How long to drive from Boston to Salem?")
            .await;

        let prompts = seen.lock().unwrap();
        // First turn has no history yet.
        assert!(prompts[0].contains("(none)"));
        // Second turn sees the first exchange.
        assert!(prompts[1].contains("How long to drive from New York to Boston?"));
        assert!(prompts[1].contains("Composed answer."));
    }
}
