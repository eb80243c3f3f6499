//! Sizes offered by the creation flows

use awsdeck_cloud::PlanOption;

/// EC2 instance types
pub const EC2_INSTANCE_TYPES: &[PlanOption] = &[
    PlanOption::new("t2.nano", "1 vCPU, 0.5GB RAM"),
    PlanOption::new("t2.micro", "1 vCPU, 1GB RAM"),
    PlanOption::new("t2.small", "1 vCPU, 2GB RAM"),
    PlanOption::new("t2.medium", "2 vCPU, 4GB RAM"),
    PlanOption::new("t2.large", "2 vCPU, 8GB RAM"),
    PlanOption::new("t2.xlarge", "4 vCPU, 16GB RAM"),
    PlanOption::new("t2.2xlarge", "8 vCPU, 32GB RAM"),
    PlanOption::new("t3.micro", "2 vCPU, 1GB RAM"),
    PlanOption::new("t3.small", "2 vCPU, 2GB RAM"),
    PlanOption::new("t3.medium", "2 vCPU, 4GB RAM"),
];

/// Lightsail instance bundles
pub const LIGHTSAIL_BUNDLES: &[PlanOption] = &[
    PlanOption::new("nano_3_1", "$5 - 512MB RAM, 2 vCPUs, 20GB SSD"),
    PlanOption::new("micro_2_0", "$7 - 1GB RAM, 2 vCPUs, 40GB SSD"),
    PlanOption::new("small_2_0", "$12 - 2GB RAM, 2 vCPUs, 60GB SSD"),
    PlanOption::new("medium_2_0", "$24 - 4GB RAM, 2 vCPUs, 80GB SSD"),
    PlanOption::new("large_2_0", "$44 - 8GB RAM, 2 vCPUs, 160GB SSD"),
    PlanOption::new("xlarge_2_0", "$84 - 16GB RAM, 4 vCPUs, 320GB SSD"),
    PlanOption::new("2xlarge_2_0", "$164 - 32GB RAM, 8 vCPUs, 640GB SSD"),
    PlanOption::new("4xlarge_2_0", "$384 - 64GB RAM, 16 vCPUs, 1280GB SSD"),
];

/// Lightsail managed database bundles
pub const LIGHTSAIL_DATABASE_BUNDLES: &[PlanOption] = &[
    PlanOption::new("micro_2_0", "1GB RAM, 2 vCPUs, 40GB SSD"),
    PlanOption::new("small_2_0", "2GB RAM, 2 vCPUs, 80GB SSD"),
    PlanOption::new("medium_2_0", "4GB RAM, 2 vCPUs, 120GB SSD"),
    PlanOption::new("large_2_0", "8GB RAM, 2 vCPUs, 240GB SSD"),
];
