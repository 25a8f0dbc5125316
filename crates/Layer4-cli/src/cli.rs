//! One-shot and REPL modes

use std::io::Write;
use std::sync::Arc;
use stepwise_agent::{Agent, AgentEvent, StopHandle, TurnFailure, TurnReport};
use stepwise_foundation::AgentSettings;
use stepwise_provider::Provider;
use stepwise_tool::ToolRegistry;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::debug;

/// 이벤트 채널 크기
const EVENT_BUFFER: usize = 256;

/// Agent plus the receiving end of its event channel
pub struct Runner {
    agent: Agent,
    events: mpsc::Receiver<AgentEvent>,
    verbose: bool,
}

impl Runner {
    pub fn new(provider: Arc<dyn Provider>, settings: AgentSettings, verbose: bool) -> Self {
        let tools = Arc::new(ToolRegistry::with_builtins());
        let (tx, events) = mpsc::channel(EVENT_BUFFER);
        let agent = Agent::new(provider, tools, settings).with_event_sender(tx);

        Self {
            agent,
            events,
            verbose,
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.agent.stop_handle()
    }

    /// Run one turn, printing events as they arrive
    pub async fn run_turn(&mut self, query: &str) -> Result<TurnReport, TurnFailure> {
        self.agent.stop_handle().reset();

        let verbose = self.verbose;
        let events = &mut self.events;
        let run = self.agent.run(query);
        tokio::pin!(run);

        let result = loop {
            tokio::select! {
                result = &mut run => break result,
                Some(event) = events.recv() => print_event(&event, verbose),
            }
        };

        // 턴이 끝난 뒤 남은 이벤트
        while let Ok(event) = events.try_recv() {
            print_event(&event, verbose);
        }

        result
    }
}

/// Ctrl+C는 진행 중인 호출이 끝난 뒤 턴을 멈춘다
pub fn stop_on_ctrl_c(handle: StopHandle) {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n⏹ Stopping after the current call...");
            handle.request_stop();
        }
    });
}

/// Run a single prompt in non-interactive mode
pub async fn run_once(mut runner: Runner, prompt: &str) -> anyhow::Result<()> {
    stop_on_ctrl_c(runner.stop_handle());

    match runner.run_turn(prompt).await {
        Ok(report) => {
            print_summary(&report, runner.verbose);
            Ok(())
        }
        Err(failure) => {
            // 에러 메시지는 main에서 anyhow가 출력한다
            if let Some(raw) = failure.error.raw_output() {
                eprintln!("raw: {}", truncate(raw, 300));
            }
            Err(failure.error.into())
        }
    }
}

/// Line-based interactive mode
pub async fn run_repl(mut runner: Runner, banner: &str) -> anyhow::Result<()> {
    stop_on_ctrl_c(runner.stop_handle());

    println!("{}", banner);
    println!("Type 'exit' or 'quit' to leave.\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if matches!(query, "exit" | "quit") {
            break;
        }

        // 실패해도 다음 입력으로 돌아간다
        match runner.run_turn(query).await {
            Ok(report) => print_summary(&report, runner.verbose),
            Err(failure) => print_failure(&failure),
        }
        println!();
    }

    Ok(())
}

fn print_event(event: &AgentEvent, verbose: bool) {
    if let Some(line) = format_event(event, verbose) {
        println!("{}", line);
    }
}

fn print_summary(report: &TurnReport, verbose: bool) {
    debug!(
        "Turn finished in {}ms: {} iteration(s), {} message(s), {} retries, {} repairs",
        report.conversation.elapsed().num_milliseconds(),
        report.iterations,
        report.conversation.len(),
        report.conversation.retries(),
        report.conversation.repairs()
    );
    if verbose {
        println!(
            "[{} iteration(s), tokens: {} in, {} out]",
            report.iterations, report.usage.input_tokens, report.usage.output_tokens
        );
    }
}

fn print_failure(failure: &TurnFailure) {
    eprintln!("❌ {}", failure.error);
    if let Some(raw) = failure.error.raw_output() {
        eprintln!("   raw: {}", truncate(raw, 300));
    }
}

/// 이벤트 한 줄 표현. 출력하지 않을 이벤트는 None
pub fn format_event(event: &AgentEvent, verbose: bool) -> Option<String> {
    match event {
        AgentEvent::Thought(content) => Some(format!("🧠: {}", content)),
        AgentEvent::ToolStart { tool, input } => {
            Some(format!("⛏️: {}({})", tool, truncate(input, 120)))
        }
        AgentEvent::Observation(content) => Some(format!("👀: {}", truncate(content, 300))),
        AgentEvent::Output(content) => Some(format!("🤖: {}", content)),
        AgentEvent::Retry {
            attempt,
            delay_ms,
            error,
        } => Some(format!(
            "↻ Backend call failed ({}), retry {} in {}ms",
            truncate(error, 120),
            attempt,
            delay_ms
        )),
        AgentEvent::Repair { attempt, reason } => Some(format!(
            "🔧 Invalid step ({}), asking the model to fix it (attempt {})",
            truncate(reason, 120),
            attempt
        )),
        AgentEvent::Warning(message) => Some(format!("⚠ {}", message)),
        AgentEvent::Usage {
            input_tokens,
            output_tokens,
        } if verbose => Some(format!(
            "[Tokens: {} in, {} out]",
            input_tokens, output_tokens
        )),
        AgentEvent::StateChanged(state) if verbose => Some(format!("· {}", state.as_str())),
        _ => None,
    }
}

/// Truncate a string for display (한 줄로, char 경계 기준)
fn truncate(s: &str, max_chars: usize) -> String {
    let s = s.replace('\n', " ");
    if s.chars().count() <= max_chars {
        s
    } else {
        let head: String = s.chars().take(max_chars).collect();
        format!("{}...", head)
    }
}
