compute::criterion_benchmark!(compute_cpu);
