//! Definition of tallyho's error and result types.

use std::io;

error_chain! {
    foreign_links {
        Io(io::Error);
    }
    errors {
        /// A file violated its codec contract: bad magic, version out of
        /// range, checksum mismatch, or a decreasing doc/term where an
        /// increasing one was promised.
        Corruption(filename: String, message: String) {
            display("corruption in {:?}: {}", filename, message)
        }
        /// The caller handed us something that can never be valid.
        InvalidArgument(message: String) {
            display("invalid argument: {}", message)
        }
        /// A query needs index data the field was not indexed with,
        /// e.g. a phrase query over a field without positions.
        FieldNotIndexed(field: String, message: String) {
            display("field {:?} lacks required index data: {}", field, message)
        }
        /// A rewrite expanded past the boolean clause ceiling.
        TooManyClauses(limit: usize) {
            display("boolean query grew past {} clauses", limit)
        }
        /// Sorted input was required and the new entry was <= the previous.
        OutOfOrder(message: String) {
            display("out-of-order input: {}", message)
        }
    }
}

impl Error {
    /// Helper for the codec readers, which all report against a file name.
    pub fn corruption<F: Into<String>, M: Into<String>>(filename: F, message: M) -> Error {
        ErrorKind::Corruption(filename.into(), message.into()).into()
    }
}
