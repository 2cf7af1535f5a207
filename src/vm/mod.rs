//! This module contains the speculative virtual machine: a worklist-based
//! enumerator that explores every execution path of a μAsm program,
//! including the transient paths an out-of-order CPU would pursue after
//! mispredicting a conditional branch.

pub mod eval;
pub mod mispredict;
pub mod path;
pub mod sequential;
pub mod state;
pub mod step;

use crate::{
    assembly::Program,
    constant::{DEFAULT_MAX_STEPS, DEFAULT_SPECULATIVE_WINDOW},
    error::{
        container::Locatable,
        execution::{Error, Errors},
    },
    vm::{
        mispredict::mispredict_step,
        path::{ExecutionPath, SpeculativeFrame},
        state::{Configuration, Observation},
        step::step,
    },
};

/// The virtual machine used to enumerate the execution paths of a μAsm
/// program under always-mispredict speculation.
///
/// Each path carries its own configuration and its own stack of speculative
/// frames; the machine itself is a single-threaded worklist loop, so no
/// instruction ever suspends mid-execution. The worklist is popped in LIFO
/// order to keep peak memory proportional to path depth rather than path
/// count — an implementation artifact, not a contract, as no ordering is
/// promised between paths.
#[derive(Clone, Debug)]
pub struct VM {
    /// The program being executed. Control-flow operands must already be
    /// resolved to integer literals (see
    /// [`crate::assembly::Program::resolve_labels`]).
    program: Program,

    /// The paths that still need exploring, newest on top.
    worklist: Vec<ExecutionPath>,

    /// The configurations of paths that ran off the end of the program
    /// architecturally.
    terminals: Vec<Configuration>,

    /// Any errors that were encountered during the course of enumeration.
    errors: Errors,

    /// The number of outer-loop iterations spent so far.
    steps: usize,

    /// The configuration of the virtual machine.
    config: Config,
}

impl VM {
    /// Constructs a new virtual machine that explores `program` starting
    /// from the partial machine state `initial`.
    #[must_use]
    pub fn new(program: Program, initial: Configuration, config: Config) -> Self {
        let worklist = vec![ExecutionPath::new(initial)];
        Self {
            program,
            worklist,
            terminals: Vec::new(),
            errors: Errors::new(),
            steps: 0,
            config,
        }
    }

    /// Enumerates every execution path of the program.
    ///
    /// Each iteration of the loop either retires one step on some path,
    /// closes an exhausted speculative frame, or records a terminal
    /// configuration; the iteration count is bounded by
    /// [`Config::max_steps`].
    ///
    /// # Errors
    ///
    /// Exceeding the step budget is fatal to the whole enumeration and
    /// discards the partially explored paths. Step-level errors instead
    /// abort only the path that encountered them: they are returned after
    /// the worklist drains if no path terminated, and are otherwise kept as
    /// warnings on the [`ExecutionResult`].
    pub fn execute(&mut self) -> Result<(), Errors> {
        while let Some(mut path) = self.worklist.pop() {
            if self.steps >= self.config.max_steps {
                let pc = path.current.pc;
                self.worklist.clear();
                return Err(Error::StepLimitExceeded {
                    max_steps: self.config.max_steps,
                }
                .locate(pc)
                .into());
            }
            self.steps += 1;

            // A frame whose window has closed rolls its path back before
            // anything else happens to it.
            if path.innermost().map_or(false, |f| f.remaining_window <= 0) {
                let frame = path.frames.pop().expect("We already know a frame is present");
                log::debug!(
                    "frame {} exhausted, rolling back to {}",
                    frame.id,
                    frame.correct_pc
                );
                path.current = rollback(path.current, frame);
                self.worklist.push(path);
                continue;
            }

            // Running off the program end under speculation is a rollback;
            // doing so architecturally retires the path.
            if path.current.pc as usize >= self.program.len() {
                if path.in_speculation() {
                    let frame = path.frames.pop().expect("We already know a frame is present");
                    log::debug!(
                        "program end under speculation, rolling back frame {} to {}",
                        frame.id,
                        frame.correct_pc
                    );
                    path.current = rollback(path.current, frame);
                    self.worklist.push(path);
                } else {
                    log::debug!("path terminated at pc {}", path.current.pc);
                    self.terminals.push(path.current);
                }
                continue;
            }

            let instruction = self
                .program
                .instruction_at(path.current.pc)
                .expect("The program counter was bounds-checked above")
                .clone();
            log::trace!("retiring {instruction}");

            let (successors, speculative) = match mispredict_step(&instruction, &path.current) {
                Ok(result) => result,
                Err(error) => {
                    log::debug!("path aborted: {error}");
                    self.errors.add(error);
                    continue;
                }
            };

            if speculative {
                // The architecturally correct successors tell each forked
                // path where its rollback must land.
                let correct = match step(&instruction, &path.current) {
                    Ok(result) => result,
                    Err(error) => {
                        log::debug!("path aborted: {error}");
                        self.errors.add(error);
                        continue;
                    }
                };
                let forked = self.open_frames(&path, successors, &correct);

                // Reversed so the first (assumed `== 0`) continuation is
                // popped first.
                self.worklist.extend(forked.into_iter().rev());
            } else {
                path.current = successors
                    .into_iter()
                    .next()
                    .expect("Non-branch steps produce exactly one successor");
                if let Some(frame) = path.innermost_mut() {
                    frame.remaining_window -= 1;
                }
                self.worklist.push(path);
            }
        }

        if self.terminals.is_empty() && !self.errors.is_empty() {
            Err(self.errors.clone())
        } else {
            Ok(())
        }
    }

    /// Forks `path` once per transient continuation, opening a speculative
    /// frame on each fork.
    ///
    /// The pairwise correspondence between `transients` and `correct` is
    /// the ordering invariant shared by the two step semantics: position
    /// `i` of both lists assumes the same branch direction.
    fn open_frames(
        &self,
        path: &ExecutionPath,
        transients: Vec<Configuration>,
        correct: &[Configuration],
    ) -> Vec<ExecutionPath> {
        assert_eq!(
            transients.len(),
            correct.len(),
            "The two step semantics must enumerate branch successors in the same order"
        );

        let branch_pc = path.current.pc;
        let window = path
            .innermost()
            .map_or(self.config.speculative_window, |f| f.remaining_window - 1);

        transients
            .into_iter()
            .zip(correct)
            .map(|(transient, architectural)| {
                let mut forked = path.clone();
                let id = forked.take_frame_id();
                forked.frames.push(SpeculativeFrame {
                    id,
                    remaining_window: window,
                    start_pc: branch_pc,
                    saved: path.current.clone(),
                    correct_pc: architectural.pc,
                });
                forked.current = transient;

                // The `start` observation goes immediately before the
                // branch's own `pc` observation, bracketing the entire
                // speculative region between `start` and `rollback`.
                let observations = &mut forked.current.trace.observations;
                let at = observations.len().saturating_sub(1);
                observations.insert(at, Observation::start(branch_pc, id));

                log::debug!("opened frame {id} at pc {branch_pc} with window {window}");
                forked
            })
            .collect()
    }

    /// Gets the number of paths that still await exploration.
    #[must_use]
    pub fn remaining_path_count(&self) -> usize {
        self.worklist.len()
    }

    /// Gets the terminal configurations collected so far.
    #[must_use]
    pub fn terminals(&self) -> &[Configuration] {
        self.terminals.as_slice()
    }

    /// Gets the program being enumerated.
    #[must_use]
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Gets a reference to the virtual machine's configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Consumes the virtual machine to produce the results of enumeration.
    #[must_use]
    pub fn consume(self) -> ExecutionResult {
        ExecutionResult {
            terminals: self.terminals,
            errors:    self.errors,
        }
    }
}

/// Restores `frame`'s saved state, resuming at the architecturally correct
/// program counter while keeping the speculative trace.
fn rollback(current: Configuration, frame: SpeculativeFrame) -> Configuration {
    let mut restored = frame.saved;
    restored.pc = frame.correct_pc;
    restored.step_count = current.step_count;
    restored.trace = current.trace;
    restored
        .trace
        .observations
        .push(Observation::rollback(frame.correct_pc, frame.id));
    restored
}

/// The results of enumerating a program's execution paths.
#[derive(Clone, Debug)]
pub struct ExecutionResult {
    /// One configuration per path that ran off the end of the program, each
    /// carrying its trace and accumulated path condition.
    pub terminals: Vec<Configuration>,

    /// Step-level errors encountered along paths that did not terminate.
    ///
    /// When this is non-empty the terminal set may not cover the full
    /// behavior of the program; inspect the errors before relying on the
    /// data.
    pub errors: Errors,
}

/// The configuration for the virtual machine instance.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    /// The number of instructions a mispredicted branch executes
    /// transiently before rolling back.
    ///
    /// Defaults to [`DEFAULT_SPECULATIVE_WINDOW`].
    pub speculative_window: i64,

    /// The maximum number of outer-loop iterations the enumerator may
    /// spend before failing with a step-limit error.
    ///
    /// Defaults to [`DEFAULT_MAX_STEPS`].
    pub max_steps: usize,
}

impl Config {
    /// Sets the `speculative_window` config parameter to `value`.
    #[must_use]
    pub fn with_speculative_window(mut self, value: i64) -> Self {
        self.speculative_window = value;
        self
    }

    /// Sets the `max_steps` config parameter to `value`.
    #[must_use]
    pub fn with_max_steps(mut self, value: usize) -> Self {
        self.max_steps = value;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        let speculative_window = DEFAULT_SPECULATIVE_WINDOW;
        let max_steps = DEFAULT_MAX_STEPS;
        Self {
            speculative_window,
            max_steps,
        }
    }
}
