pub mod diners;
