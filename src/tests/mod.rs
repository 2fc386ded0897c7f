
mod test_evaluation;
