// SPDX-License-Identifier: Apache-2.0

//! The sample ladder program: three small modules wired through R/MR/DM.

use plcsim_engine::{Error, LadderModule, ScanContext};
use plcsim_memory::Source;

/// Copies the input relay R0 to the internal relay MR0.
struct InputMirror;

impl LadderModule for InputMirror {
    fn name(&self) -> &str {
        "input_mirror"
    }

    fn execute(&mut self, ctx: &mut ScanContext<'_>) -> Result<(), Error> {
        let source = Source::ladder(self.name());
        let input = ctx.mem.read_bits("R", 0, 1, &source)?[0];
        ctx.mem
            .write_bits("MR", 0, &[i64::from(input != 0)], &source)?;
        Ok(())
    }
}

/// Counts rising edges of MR0; the count goes to DM100, the done flag to MR1.
struct PartsCounter;

impl LadderModule for PartsCounter {
    fn name(&self) -> &str {
        "parts_counter"
    }

    fn execute(&mut self, ctx: &mut ScanContext<'_>) -> Result<(), Error> {
        let source = Source::ladder(self.name());
        let input = ctx.mem.read_bits("MR", 0, 1, &source)?[0] != 0;
        let (q, cv) = ctx.ctu("parts", input, 3, false);
        ctx.mem.write_words("DM", 100, &[cv], &source)?;
        ctx.mem.write_bits("MR", 1, &[i64::from(q)], &source)?;
        Ok(())
    }
}

/// Latches DM101 once the counter's done flag MR1 is up.
struct BatchDone;

impl LadderModule for BatchDone {
    fn name(&self) -> &str {
        "batch_done"
    }

    fn execute(&mut self, ctx: &mut ScanContext<'_>) -> Result<(), Error> {
        let source = Source::ladder(self.name());
        let done = ctx.mem.read_bits("MR", 1, 1, &source)?[0];
        if done != 0 {
            ctx.mem.write_words("DM", 101, &[1], &source)?;
        }
        Ok(())
    }
}

/// Resolves a configured module name to its implementation.
pub fn build(name: &str) -> Option<Box<dyn LadderModule>> {
    match name {
        "input_mirror" => Some(Box::new(InputMirror)),
        "parts_counter" => Some(Box::new(PartsCounter)),
        "batch_done" => Some(Box::new(BatchDone)),
        _ => None,
    }
}
