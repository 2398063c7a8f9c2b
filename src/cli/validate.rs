use super::ui;
use crate::core::error::AllocationError;
use crate::core::taxonomy::AllocationTree;
use anyhow::Result;

/// Renders the weight check as text, returning the violations alongside.
pub fn render_validation(allocation: &AllocationTree) -> (String, Vec<String>) {
    let errors = allocation.validate_weights();
    let mut output = format!(
        "Allocation: {}\n\n",
        ui::style_text(allocation.root().name(), ui::StyleType::Title)
    );

    if errors.is_empty() {
        output.push_str(&ui::style_text(
            "All node weights sum to 1.0",
            ui::StyleType::Success,
        ));
    } else {
        for error in &errors {
            output.push_str(&format!("  {}\n", ui::style_text(error, ui::StyleType::Error)));
        }
    }
    (output, errors)
}

pub fn run(allocation: &AllocationTree) -> Result<()> {
    let (output, errors) = render_validation(allocation);
    println!("{output}");
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AllocationError::WeightSumMismatch(errors).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::taxonomy::TaxonomyBuilder;

    #[test]
    fn test_valid_allocation() {
        let mut builder = TaxonomyBuilder::new("Global", 1.0);
        let root = builder.root();
        builder.add_child(root, "A", 0.6);
        builder.add_child(root, "B", 0.4);
        let tree = builder.build();

        let (output, errors) = render_validation(&tree);
        assert!(errors.is_empty());
        assert!(output.contains("All node weights sum to 1.0"));
        assert!(run(&tree).is_ok());
    }

    #[test]
    fn test_invalid_allocation_fails() {
        let mut builder = TaxonomyBuilder::new("Global", 1.0);
        let root = builder.root();
        builder.add_child(root, "A", 0.6);
        builder.add_child(root, "B", 0.3);
        let tree = builder.build();

        let (output, errors) = render_validation(&tree);
        assert_eq!(errors.len(), 1);
        assert!(output.contains("Global allocation must equal 1.0"));

        let err = run(&tree).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AllocationError>(),
            Some(AllocationError::WeightSumMismatch(_))
        ));
    }
}
