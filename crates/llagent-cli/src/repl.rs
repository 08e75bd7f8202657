//! Interactive read-eval loop.

use std::io::Write;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};

use llagent_runtime::{AgentLoop, EventEmitter, Interrupt};
use llagent_skills::{AgentsMdManager, SkillsManager};
use llagent_tools::ToolRegistry;

use crate::render::Renderer;

/// Everything the REPL needs.
pub struct Repl {
    pub agent: AgentLoop,
    pub emitter: Arc<EventEmitter>,
    pub interrupt: Arc<Interrupt>,
    pub registry: Arc<ToolRegistry>,
    pub skills: SkillsManager,
    pub agents_md: AgentsMdManager,
    pub color: bool,
}

/// Outcome of handling one input line.
enum Handled {
    Continue,
    Exit,
}

impl Repl {
    /// Run until `/exit` or EOF.
    pub async fn run(&mut self) -> std::io::Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            print!("\n> ");
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                break; // EOF
            };
            let input = line.trim();
            if input.is_empty() {
                continue;
            }

            match self.handle(input).await {
                Handled::Exit => break,
                Handled::Continue => {}
            }
        }
        Ok(())
    }

    async fn handle(&mut self, input: &str) -> Handled {
        match input {
            "/exit" | "/quit" => return Handled::Exit,
            "/clear" => {
                self.agent.clear();
                println!("Conversation cleared.");
            }
            "/tools" => self.print_tools(),
            "/skills" => self.print_skills(),
            "/agents" => self.print_agents_md(),
            _ => self.send(input).await,
        }
        Handled::Continue
    }

    fn print_tools(&self) {
        println!("Available tools:");
        for schema in self.registry.schemas() {
            let summary: String = schema.description.lines().next().unwrap_or("").to_owned();
            println!("  {:10} {summary}", schema.name);
        }
    }

    fn print_skills(&self) {
        let skills = self.skills.skills();
        if skills.is_empty() {
            println!("No skills discovered.");
            return;
        }
        println!("Skills:");
        for skill in skills {
            println!("  {:20} {}", skill.name, skill.description);
        }
    }

    fn print_agents_md(&self) {
        let files = self.agents_md.files();
        if files.is_empty() {
            println!("No AGENTS.md files discovered.");
            return;
        }
        println!("AGENTS.md files:");
        for file in files {
            println!("  {} ({} bytes)", file.path.display(), file.content.len());
        }
    }

    async fn send(&mut self, prompt: &str) {
        self.interrupt.reset();

        // Render events concurrently with the run; the task ends at the
        // terminal event.
        let mut rx = self.emitter.subscribe();
        let color = self.color;
        let renderer = tokio::spawn(async move {
            let mut renderer = Renderer::new(color);
            while let Ok(event) = rx.recv().await {
                let terminal = event.is_terminal();
                let _ = renderer.render(&event);
                if terminal {
                    break;
                }
            }
        });

        let _ = self.agent.run(prompt).await;
        let _ = renderer.await;
    }
}
