use crate::model::Operation;

// Operands compare as strings, so "9" is greater than "10".
pub(super) fn matches(operation: Operation, values: &[String], input: &str) -> bool {
    match operation {
        Operation::Equal => values.first().is_some_and(|v| input == v),
        Operation::NotEqual | Operation::NotExist => !values.iter().any(|v| v == input),
        Operation::Exist => values.iter().any(|v| v == input),
        Operation::Greater => values.iter().any(|v| input > v.as_str()),
        Operation::Lower => values.iter().any(|v| input < v.as_str()),
        Operation::Between => match values {
            [low, high, ..] => low.as_str() <= input && input <= high.as_str(),
            _ => false,
        },
        _ => false,
    }
}
