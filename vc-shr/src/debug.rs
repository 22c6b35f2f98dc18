//  DEBUG.rs
//    by Lut99
//
//  Created:
//    03 Oct 2026, 10:03:12
//  Last edited:
//    08 Oct 2026, 15:51:36
//  Auto updated?
//    Yes
//
//  Description:
//!   Implements a few debug tools.
//

use std::fmt::{Display, Formatter, Result as FResult};


/***** TESTS *****/





/***** LIBRARY *****/
/// Defines a struct that can format a large block of text neatly (e.g., the stdout of a process).
pub struct BlockFormatter<S1> {
    /// Reference to the thing to format.
    to_fmt : S1,
}
impl<S1> BlockFormatter<S1> {
    /// Constructor for the BlockFormatter.
    ///
    /// # Arguments
    /// - `to_fmt`: The thing to format.
    ///
    /// # Returns
    /// A new BlockFormatter instance.
    #[inline]
    pub fn new(to_fmt: S1) -> Self {
        Self {
            to_fmt,
        }
    }
}
impl<S1> Display for BlockFormatter<S1>
where
    S1: Display,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> FResult {
        // Render first so we can substitute a placeholder for empty output
        let text: String = self.to_fmt.to_string();
        let text: &str = if text.trim().is_empty() { "<empty>" } else { text.trim_end() };

        writeln!(f, "{}\n{}\n{}",
            (0..80).map(|_| '-').collect::<String>(),
            text,
            (0..80).map(|_| '-').collect::<String>(),
        )?;

        // Done
        Ok(())
    }
}
