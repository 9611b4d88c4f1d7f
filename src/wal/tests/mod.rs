mod tests_framing;
mod tests_truncation;
