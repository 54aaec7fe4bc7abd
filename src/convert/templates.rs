//! Primary documents synthesized when a bundle has none.

use crate::core::{AnalysisRecord, ResourceKind};

const SKILL_BODY: &str = r"## Overview

This skill is based on a definition imported from an external source.

## Workflow

### 1. Plan

(Describe the execution plan.)

### 2. Agree

(List what the user must confirm.)

### 3. Execute

(Describe the execution steps.)

### 4. Verify

(Describe how the result is verified.)

## Dependencies

";

const SKILL_FOOTER: &str = r"
## Usage

```bash
# usage example
```

## Notes

Generated from an external definition. Adjust the content as needed.
";

const AGENT_BODY: &str = r"## Role

This agent is based on a definition imported from an external source.

## Specialty

(Describe the area of expertise.)

## Workflow

### Receive task

(Describe how tasks are received.)

### Execute

(Describe the execution steps.)

### Report

(Describe how results are reported.)

## Resources

";

const AGENT_FOOTER: &str = r"
## Collaboration

(Describe how this agent works with other agents.)

## Notes

Generated from an external definition. Adjust the content as needed.
";

/// Render the placeholder document for `kind`, titled `title`.
#[must_use]
pub fn render(
    kind: ResourceKind,
    title: &str,
    purpose: &str,
    scope: &str,
    record: &AnalysisRecord,
) -> String {
    let (body, footer) = match kind {
        ResourceKind::Skill => (SKILL_BODY, SKILL_FOOTER),
        ResourceKind::Agent => (AGENT_BODY, AGENT_FOOTER),
    };

    let mut doc = format!("# {title}\n\n- Purpose: {purpose}\n- Scope: {scope}\n\n{body}");
    if record.dependencies.is_empty() {
        doc.push_str("- none\n");
    } else {
        for dep in &record.dependencies {
            doc.push_str("- ");
            doc.push_str(dep);
            doc.push('\n');
        }
    }
    doc.push_str(footer);
    doc
}
