mod harvest_tests;
