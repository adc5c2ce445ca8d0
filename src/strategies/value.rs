use crate::model::Operation;

pub(super) fn matches(operation: Operation, values: &[String], input: &str) -> bool {
    match operation {
        Operation::Equal => values.first().is_some_and(|v| v == input),
        Operation::NotEqual | Operation::NotExist => !contains(values, input),
        Operation::Exist => contains(values, input),
        _ => false,
    }
}

fn contains(values: &[String], input: &str) -> bool {
    values.iter().any(|v| v == input)
}
