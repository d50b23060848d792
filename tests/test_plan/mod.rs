use std::fs;
use std::io;
use std::path::Path;

use merino::*;

#[derive(Debug, PartialEq, Eq)]
pub enum PlanStep {
    Line(String),
    Option(String),
    Select(usize),
    Command(String),
    Stop,
}

impl PlanStep {
    fn new(line: &str) -> Self {
        let mut split_line = line.splitn(2, ": ");
        match split_line.next() {
            Some("line") => Self::Line(split_line.next().unwrap().to_owned()),
            Some("option") => Self::Option(split_line.next().unwrap().to_owned()),
            Some("select") => {
                let index: usize = split_line.next().and_then(|s| s.parse().ok()).unwrap();
                if index < 1 {
                    panic!("Select index must be 1 or greater.");
                }
                Self::Select(index - 1)
            }
            Some("command") => Self::Command(split_line.next().unwrap().to_owned()),
            Some("stop") => Self::Stop,
            Some(step) => panic!(
                "Could not parse test plan step \"{}\" in line \"{}\"",
                step, line
            ),
            None => panic!("Could not parse test plan step in line \"{}\"", line),
        }
    }
}

pub struct TestPlan {
    steps: Vec<PlanStep>,
    next_step_index: usize,
    options: Vec<String>,
}

impl TestPlan {
    pub fn load(plan_path: &Path) -> io::Result<Self> {
        let plan_text = fs::read_to_string(plan_path)?;
        let steps: Vec<_> = plan_text
            .lines()
            .map(|line| line.trim_start())
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(PlanStep::new)
            .collect();

        Ok(Self {
            steps,
            next_step_index: 0,
            options: Vec::new(),
        })
    }

    /// Moves to the next step that expects something from the session,
    /// collecting any `option` steps passed on the way.
    pub fn next(&mut self) {
        if let Some(PlanStep::Select(_)) = self.current_step() {
            // The options belonged to the selection we just made.
            self.options.clear();
        }

        while let Some(step) = self.steps.get(self.next_step_index) {
            self.next_step_index += 1;
            match step {
                PlanStep::Option(option) => self.options.push(option.clone()),
                _ => return,
            }
        }

        // Fell off the end of the plan; only the end of the dialogue is
        // expected now.
        self.next_step_index = self.steps.len() + 1;
    }

    pub fn current_step(&self) -> Option<&PlanStep> {
        match self.next_step_index {
            0 => None,
            i if i <= self.steps.len() => Some(&self.steps[i - 1]),
            _ => Some(&PlanStep::Stop),
        }
    }
}

pub struct PlanRunner {
    pub session: DialogueSession,
    nodes: Vec<NodeRecord>,
    plan: TestPlan,
}

impl PlanRunner {
    pub fn new(yarn_path: &str) -> Self {
        let _ = pretty_env_logger::try_init();

        let yarn_path = Path::new(yarn_path);
        let text = fs::read_to_string(yarn_path).unwrap();
        let nodes = codec::parse(&text).unwrap();

        let mut session = DialogueSession::new(SessionConfig {
            file_name: Some(yarn_path.display().to_string()),
            ..SessionConfig::default()
        });
        session.set_error_handler(|err| panic!("Unexpected script error: {}", err));
        session.library.insert(
            "assert".to_string(),
            FunctionInfo::new(1, |_session: &DialogueSession, parameters: &[YarnValue]| {
                assert!(parameters[0].as_bool(), "Assertion failed");
            }),
        );

        let plan_path = yarn_path.with_extension("testplan");
        let plan = TestPlan::load(&plan_path).unwrap();

        Self {
            session,
            nodes,
            plan,
        }
    }

    pub fn run(&mut self) -> Result<()> {
        self.session.start("Start", &self.nodes)?;

        loop {
            match self.session.continue_dialogue()? {
                SuspendReason::Line(line) => {
                    // Assert that the test plan expects this line.
                    self.plan.next();
                    let plan_step = self.plan.current_step().unwrap();
                    assert!(
                        matches!(plan_step, PlanStep::Line(plan_text) if *plan_text == line.text),
                        "[{}] Expected the line {:?}, got \"{}\"",
                        self.plan.next_step_index,
                        plan_step,
                        line.text
                    );
                    self.session.acknowledge_line()?;
                }
                SuspendReason::Options(options) => {
                    // Assert that the test plan expects these options.
                    self.plan.next();
                    let option_texts: Vec<_> = options.iter()
                        .map(|option| option.line.text.clone())
                        .collect();
                    assert_eq!(option_texts, self.plan.options);

                    match self.plan.current_step().unwrap() {
                        PlanStep::Select(i) => self.session.choose_option(*i)?,
                        step => panic!("Expected PlanStep::Select, got {:?}", step),
                    }
                }
                SuspendReason::Command(command) => {
                    // Assert that the test plan expects this command.
                    self.plan.next();
                    let plan_step = self.plan.current_step().unwrap();
                    assert!(
                        matches!(plan_step, PlanStep::Command(plan_text) if *plan_text == command),
                        "Expected the command {:?}, got \"{}\"",
                        plan_step,
                        command
                    );
                    self.session.acknowledge_command()?;
                }
                SuspendReason::NodeComplete { .. } => {}
                SuspendReason::DialogueComplete(_) => {
                    // Assert that the test plan expects the end of dialogue.
                    self.plan.next();
                    let plan_step = self.plan.current_step().unwrap();
                    assert_eq!(*plan_step, PlanStep::Stop);
                    break;
                }
            }
        }

        Ok(())
    }
}
