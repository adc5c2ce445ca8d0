use crate::model::Operation;
use crate::regex_guard::RegexGuard;

pub(super) fn matches(operation: Operation, values: &[String], input: &str, guard: &RegexGuard) -> bool {
    match operation {
        Operation::Exist => guard.is_match(values, input),
        Operation::NotExist => !guard.is_match(values, input),
        Operation::Equal => whole_word_match(values, input, guard),
        Operation::NotEqual => !whole_word_match(values, input, guard),
        _ => false,
    }
}

fn whole_word_match(values: &[String], input: &str, guard: &RegexGuard) -> bool {
    let Some(first) = values.first() else {
        return false;
    };

    guard.is_match(&[format!(r"\b{first}\b")], input)
}
