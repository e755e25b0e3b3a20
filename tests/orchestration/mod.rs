mod admission_tests;
mod execution_tests;
mod helpers;
mod manifest_tests;
